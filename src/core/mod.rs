//! Core: 下载列表、传输、文件目录等核心逻辑模块

pub mod error;
pub mod naming;
pub mod store;
pub mod transfer;
pub mod transport;
pub mod views;

// 只导出主流程和其它模块实际用到的类型
pub use error::{DownloadError, DownloadResult};
pub use store::FileStore;
pub use transfer::DownloadManager;
pub use transport::{HttpTransport, Transport};
