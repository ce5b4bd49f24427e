//! `transfer` 模块负责下载列表与下载生命周期
//!
//! 主要包括：
//! - `state`: 单个下载的状态 `TransferState`
//! - `registry`: 按插入顺序保存的下载列表 `DownloadRegistry`
//! - `actor`: `DownloadManager` 的定义
//! - `messages`: 发给下载管理器的命令
//! - `handlers`: 命令与传输层事件的处理器

pub mod actor;
pub mod handlers;
pub mod messages;
pub mod registry;
pub mod state;

pub use actor::DownloadManager;
pub use messages::{
    BeginDownload, BeginDownloadFrom, CancelAll, CancelDownload, DownloadSnapshot, ListDownloads,
    PauseDownload, ReattachTransfers, ResumeDownload,
};
pub use registry::DownloadRegistry;
pub use state::{TransferState, TransferStatus};
