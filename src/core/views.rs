//! 核心对外的协作接口：进度视图、文件视图、错误提示、完成处理

use std::path::PathBuf;

/// 错误提示，调用后立即返回，不需要应答
pub trait ErrorReporter {
    fn report_error(&self, message: &str, title: &str);
}

/// 下载列表视图
///
/// 所有 `index` 都是调用那一刻在下载列表中的位置，
/// 删除后的下标调整由视图自己负责。
pub trait DownloadProgressView: ErrorReporter {
    fn download_began(&self, index: usize);
    fn download_paused(&self, index: usize);
    fn download_resumed(&self, index: usize);
    fn progressed(&self, index: usize, fraction: f64);
    fn download_cancelled(&self, index: usize);
    fn downloads_cancelled(&self);
}

/// 已下载文件视图
pub trait DownloadedFileView: ErrorReporter {
    fn file_imported(&self, index: usize);
    fn file_deleted(&self, index: usize);
    fn files_deleted(&self);
}

/// 下载完成后的唯一接收者，负责接手临时文件
pub trait DownloadCompletionHandler {
    fn download_completed(&self, index: usize, temp_path: PathBuf, preferred_filename: String);
}

/// 只写日志的错误提示，没有视图时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_error(&self, message: &str, title: &str) {
        log::error!("{}: {}", title, message);
    }
}
