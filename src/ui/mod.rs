mod progress;

use actix::Addr;
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Weak;

use crate::core::store::FileStore;
use crate::core::transfer::{DownloadSnapshot, TransferStatus};
use crate::core::views::{DownloadCompletionHandler, DownloadProgressView, DownloadedFileView, ErrorReporter};
pub use progress::ProgressManager;

pub fn print_success(message: &str) {
    println!("✓ {}", message);
}

pub fn print_error(message: &str) {
    println!("✗ {}", message);
}

/// 终端界面，同时充当下载列表视图和文件视图
pub struct TerminalView {
    progress: ProgressManager,
    files: Cell<usize>,
}

impl TerminalView {
    pub fn new(progress: ProgressManager, files: usize) -> Self {
        Self {
            progress,
            files: Cell::new(files),
        }
    }

    pub fn downloads(&self) -> usize {
        self.progress.len()
    }

    pub fn files(&self) -> usize {
        self.files.get()
    }

    /// 用下载列表快照刷新每一行的文字
    pub fn sync(&self, snapshot: &[DownloadSnapshot]) {
        for (index, item) in snapshot.iter().enumerate() {
            let state = match item.status {
                TransferStatus::Active => "",
                TransferStatus::Suspending => "[暂停中] ",
                TransferStatus::Suspended => "[已暂停] ",
            };
            self.progress.set_message(index, format!("{}{}", state, item.url));
        }
    }

    /// 下载完成，移出列表
    fn download_finished(&self, index: usize, filename: &str) {
        self.progress.remove(index);
        self.progress.println(format!("✓ 下载完成: {}", filename));
    }
}

impl ErrorReporter for TerminalView {
    fn report_error(&self, message: &str, title: &str) {
        self.progress.println(format!("✗ {}: {}", title, message));
    }
}

impl DownloadProgressView for TerminalView {
    fn download_began(&self, index: usize) {
        self.progress.insert(index);
    }

    fn download_paused(&self, index: usize) {
        self.progress.set_message(index, "[暂停中]");
    }

    fn download_resumed(&self, index: usize) {
        self.progress.set_message(index, "继续下载…");
    }

    fn progressed(&self, index: usize, fraction: f64) {
        self.progress.set_fraction(index, fraction);
    }

    fn download_cancelled(&self, index: usize) {
        self.progress.remove(index);
    }

    fn downloads_cancelled(&self) {
        self.progress.clear();
        self.progress.println("已取消全部下载");
    }
}

impl DownloadedFileView for TerminalView {
    fn file_imported(&self, index: usize) {
        self.files.set(self.files.get() + 1);
        log::debug!("文件 #{} 已加入下载目录", index);
    }

    fn file_deleted(&self, index: usize) {
        self.files.set(self.files.get().saturating_sub(1));
        log::debug!("文件 #{} 已删除", index);
    }

    fn files_deleted(&self) {
        self.files.set(0);
        self.progress.println("已删除全部文件");
    }
}

/// 下载完成的唯一接收者：先更新界面，再把文件交给文件目录
pub struct CompletionRelay {
    store: Addr<FileStore>,
    view: Weak<TerminalView>,
}

impl CompletionRelay {
    pub fn new(store: Addr<FileStore>, view: Weak<TerminalView>) -> Self {
        Self { store, view }
    }
}

impl DownloadCompletionHandler for CompletionRelay {
    fn download_completed(&self, index: usize, temp_path: PathBuf, preferred_filename: String) {
        if let Some(view) = self.view.upgrade() {
            view.download_finished(index, &preferred_filename);
        }
        self.store.download_completed(index, temp_path, preferred_filename);
    }
}

/// 退出时的摘要
pub struct DownloadSummary {
    pub unfinished: usize,
    pub files: usize,
    pub elapsed_time: std::time::Duration,
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n下载摘要:")?;
        writeln!(f, "未完成的下载: {}", self.unfinished)?;
        writeln!(f, "下载目录中的文件: {}", self.files)?;
        writeln!(f, "运行时间: {:.2}秒", self.elapsed_time.as_secs_f64())?;
        if self.unfinished > 0 {
            writeln!(f, "未完成的下载会在下次启动时继续")?;
        }
        Ok(())
    }
}
