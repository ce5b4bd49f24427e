//! `store` 模块管理已下载文件所在的目录
//!
//! - `actor`: `FileStore` 的定义，以及它作为下载完成处理者的实现
//! - `messages` / `handlers`: 导入、删除、对齐等操作
//! - `disk`: 不覆盖已有文件的移动与复制、目录扫描

pub mod actor;
pub mod disk;
pub mod handlers;
pub mod messages;

pub use actor::FileStore;
pub use messages::{DeleteAll, DeleteFile, ImportFile, ImportMode, ListFiles, Reconcile, SetForeground};
