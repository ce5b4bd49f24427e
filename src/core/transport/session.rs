use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use super::{LiveTransfer, TransferHandle};

/// 续传时用来确认服务器文件未变化的校验信息
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// ================== 会话记录 ==================
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionEntry {
    pub handle: TransferHandle,
    pub url: String,
    pub partial: PathBuf,
    #[serde(default)]
    pub validators: Validators,
}

/// 传输会话文件，记录所有尚未结束的传输
pub struct SessionStore {
    path: PathBuf,
    entries: Vec<SessionEntry>,
}

impl SessionStore {
    /// 读取会话文件，文件不存在或损坏时从空会话开始
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<Vec<SessionEntry>>(&data) {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("会话文件损坏，忽略: {} ({})", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn get(&self, handle: TransferHandle) -> Option<&SessionEntry> {
        self.entries.iter().find(|e| e.handle == handle)
    }

    /// 插入或更新一条记录并立即保存
    pub fn upsert(&mut self, entry: SessionEntry) {
        match self.entries.iter_mut().find(|e| e.handle == entry.handle) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.save();
    }

    pub fn remove(&mut self, handle: TransferHandle) -> Option<SessionEntry> {
        let pos = self.entries.iter().position(|e| e.handle == handle)?;
        let entry = self.entries.remove(pos);
        self.save();
        Some(entry)
    }

    /// 会话中可以恢复的传输，URL 无法解析的记录被跳过
    pub fn live_transfers(&self) -> Vec<LiveTransfer> {
        self.entries
            .iter()
            .filter_map(|entry| match Url::parse(&entry.url) {
                Ok(url) => Some(LiveTransfer { handle: entry.handle, url }),
                Err(e) => {
                    log::warn!("会话记录中的URL无效: {} ({})", entry.url, e);
                    None
                }
            })
            .collect()
    }

    fn save(&self) {
        let json = match serde_json::to_string_pretty(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                log::error!("无法序列化传输会话: {}", e);
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.path, json) {
            log::error!("无法保存传输会话 {}: {}", self.path.display(), e);
        }
    }
}
