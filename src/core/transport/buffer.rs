use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::core::error::DownloadError;

/// 缓冲区管理器
///
/// 把网络数据攒够一块再写入临时文件。被丢弃时会把剩余数据刷入文件，
/// 这样传输被中途打断时，文件长度始终等于已收到的字节数。
pub struct BufferManager {
    buffer: Vec<u8>,
    buffer_size: usize,
    file_handle: File,
    total_written: u64,
}

impl BufferManager {
    /// 打开临时文件，`append` 为 false 时清空原有内容
    pub fn open(file_path: &Path, buffer_size: usize, append: bool) -> Result<Self, DownloadError> {
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file_handle = options
            .open(file_path)
            .map_err(|e| DownloadError::disk("write", e))?;

        Ok(Self {
            buffer: Vec::with_capacity(buffer_size),
            buffer_size,
            file_handle,
            total_written: 0,
        })
    }

    /// 向缓冲区写入数据
    pub fn write(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        let mut rest = data;
        while !rest.is_empty() {
            let space_left = self.buffer_size - self.buffer.len();
            let to_copy = space_left.min(rest.len());
            self.buffer.extend_from_slice(&rest[..to_copy]);
            rest = &rest[to_copy..];

            if self.buffer.len() == self.buffer_size {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// 将缓冲区内容刷入文件
    pub fn flush(&mut self) -> Result<(), DownloadError> {
        if !self.buffer.is_empty() {
            self.file_handle
                .write_all(&self.buffer)
                .map_err(|e| DownloadError::disk("write", e))?;
            self.total_written += self.buffer.len() as u64;
            self.buffer.clear();
        }
        Ok(())
    }

    /// 获取已写入文件的字节数
    pub fn total_written(&self) -> u64 {
        self.total_written
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("缓冲区刷新失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_flushes_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part");
        let mut buffer = BufferManager::open(&path, 4, false).unwrap();

        buffer.write(b"abcdef").unwrap();
        assert_eq!(buffer.total_written(), 4);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcd");

        buffer.flush().unwrap();
        assert_eq!(buffer.total_written(), 6);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn test_buffer_flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part");
        {
            let mut buffer = BufferManager::open(&path, 1024, false).unwrap();
            buffer.write(b"partial").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"partial");
    }

    #[test]
    fn test_append_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part");
        std::fs::write(&path, b"head-").unwrap();

        {
            let mut buffer = BufferManager::open(&path, 16, true).unwrap();
            buffer.write(b"tail").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"head-tail");

        {
            let mut buffer = BufferManager::open(&path, 16, false).unwrap();
            buffer.write(b"new").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }
}
