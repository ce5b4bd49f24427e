use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use super::messages::ImportMode;

/// 列出目录中的普通文件，按文件名排序；以 `.` 开头的条目（如传输临时目录）不计入
pub fn scan_namespace(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_file() {
            files.push(root.join(entry.file_name()));
        }
    }
    files.sort();
    Ok(files)
}

/// 目标已存在时返回 `AlreadyExists`，绝不覆盖
pub fn place_file(source: &Path, dest: &Path, mode: ImportMode) -> io::Result<()> {
    match mode {
        ImportMode::Copy => copy_no_clobber(source, dest),
        ImportMode::Move => {
            match fs::hard_link(source, dest) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(e),
                // 跨文件系统等情况
                Err(_) => copy_no_clobber(source, dest)?,
            }
            if let Err(e) = fs::remove_file(source) {
                log::warn!("已导入但无法删除源文件 {}: {}", source.display(), e);
            }
            Ok(())
        }
    }
}

fn copy_no_clobber(source: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dest)?;
    if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}

/// 文件已经不存在也算删除成功
pub fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// 包括悬空的符号链接
pub fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_skips_hidden_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        fs::create_dir(dir.path().join(".transfers")).unwrap();
        fs::create_dir(dir.path().join("folder")).unwrap();

        let files = scan_namespace(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.txt"), dir.path().join("b.txt")]);
    }

    #[test]
    fn test_place_never_overwrites() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let dest = dir.path().join("dest");
        fs::write(&source, b"new").unwrap();
        fs::write(&dest, b"old").unwrap();

        for mode in [ImportMode::Copy, ImportMode::Move] {
            let err = place_file(&source, &dest, mode).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        }
        assert_eq!(fs::read(&dest).unwrap(), b"old");
        assert!(source.exists());
    }

    #[test]
    fn test_move_and_copy() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        fs::write(&source, b"data").unwrap();

        place_file(&source, &dir.path().join("copied"), ImportMode::Copy).unwrap();
        assert!(source.exists());

        place_file(&source, &dir.path().join("moved"), ImportMode::Move).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(dir.path().join("moved")).unwrap(), b"data");
        assert_eq!(fs::read(dir.path().join("copied")).unwrap(), b"data");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let err = place_file(&dir.path().join("nope"), &dir.path().join("dest"), ImportMode::Move).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!dir.path().join("dest").exists());
        assert!(remove_file(&dir.path().join("nope")).is_ok());
    }
}
