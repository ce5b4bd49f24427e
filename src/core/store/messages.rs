use actix::Message;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::DownloadResult;

/// 导入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    Move,
    Copy,
}

impl ImportMode {
    pub(super) fn operation(self) -> &'static str {
        match self {
            ImportMode::Move => "move",
            ImportMode::Copy => "copy",
        }
    }
}

/// 当前缓存的文件列表
pub struct ListFiles;
impl Message for ListFiles { type Result = Vec<PathBuf>; }

/// 导入文件，成功时返回最终位置；源文件已在列表中时返回 `None`
pub struct ImportFile {
    pub source: PathBuf,
    pub preferred_filename: Option<String>,
    pub mode: ImportMode,
}
impl Message for ImportFile { type Result = DownloadResult<Option<PathBuf>>; }

pub struct DeleteFile {
    pub path: PathBuf,
}
impl Message for DeleteFile { type Result = DownloadResult<()>; }

pub struct DeleteAll;
impl Message for DeleteAll { type Result = DownloadResult<()>; }

/// 与磁盘上的实际内容对齐
pub struct Reconcile;
impl Message for Reconcile { type Result = (); }

/// 前台时定期对齐，后台时停止
pub struct SetForeground(pub bool);
impl Message for SetForeground { type Result = (); }
