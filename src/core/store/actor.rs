use actix::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::naming;
use crate::core::views::{DownloadCompletionHandler, DownloadedFileView, ErrorReporter, LogReporter};
use super::disk;
use super::messages::{ImportFile, ImportMode};

/// 已下载文件目录的 Actor
///
/// `files` 是目录内容的缓存，按发现或导入的顺序排列，只在本 Actor 内修改。
pub struct FileStore {
    root: PathBuf,
    collision_limit: u32,
    reconcile_interval: Duration,
    pub(super) files: Vec<PathBuf>,
    view: Option<Weak<dyn DownloadedFileView>>,
    pub(super) timer: Option<SpawnHandle>,
}

impl Actor for FileStore {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        log::info!("文件目录已打开: {} ({} 个文件)", self.root.display(), self.files.len());
    }
}

impl FileStore {
    /// 打开（必要时创建）目录并读取初始列表
    pub fn open(root: impl Into<PathBuf>, collision_limit: u32, reconcile_interval: Duration) -> DownloadResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let files = disk::scan_namespace(&root)?;
        Ok(Self {
            root,
            collision_limit,
            reconcile_interval,
            files,
            view: None,
            timer: None,
        })
    }

    pub fn with_view(mut self, view: Weak<dyn DownloadedFileView>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub(super) fn reconcile_interval(&self) -> Duration {
        self.reconcile_interval
    }

    fn view(&self) -> Option<Rc<dyn DownloadedFileView>> {
        self.view.as_ref().and_then(Weak::upgrade)
    }

    pub(super) fn notify<F>(&self, f: F)
    where
        F: FnOnce(&dyn DownloadedFileView),
    {
        if let Some(view) = self.view() {
            f(view.as_ref());
        }
    }

    pub(super) fn report(&self, error: &DownloadError) {
        let (message, title) = (error.message(), error.title());
        match self.view() {
            Some(view) => {
                log::warn!("{}: {}", title, message);
                view.report_error(&message, &title);
            }
            None => LogReporter.report_error(&message, &title),
        }
    }

    pub(super) fn import(&mut self, msg: ImportFile) -> DownloadResult<Option<PathBuf>> {
        if self.files.contains(&msg.source) {
            log::debug!("文件已在列表中: {}", msg.source.display());
            return Ok(None);
        }
        let name = msg
            .preferred_filename
            .map(|name| naming::sanitize_filename(&name))
            .filter(|name| !name.is_empty())
            .or_else(|| msg.source.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "file".to_string());

        // 选好名字到真正写入之间目录可能被外部修改，写入冲突时重新选名
        for _ in 0..self.collision_limit {
            let chosen = naming::resolve_collision_free_name(&name, self.collision_limit, |candidate| {
                disk::occupied(&self.root.join(candidate))
            })?;
            let dest = self.root.join(&chosen);
            match disk::place_file(&msg.source, &dest, msg.mode) {
                Ok(()) => {
                    log::info!("已导入 {} -> {}", msg.source.display(), dest.display());
                    self.files.push(dest.clone());
                    let index = self.files.len() - 1;
                    self.notify(|view| view.file_imported(index));
                    return Ok(Some(dest));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(DownloadError::disk(msg.mode.operation(), e)),
            }
        }
        Err(DownloadError::ImportCollision(name))
    }

    pub(super) fn delete(&mut self, path: &Path) -> DownloadResult<()> {
        let Some(index) = self.files.iter().position(|f| f == path) else {
            return Ok(());
        };
        disk::remove_file(path).map_err(|e| DownloadError::disk("delete", e))?;
        self.files.remove(index);
        log::info!("已删除 #{}: {}", index, path.display());
        self.notify(|view| view.file_deleted(index));
        Ok(())
    }

    pub(super) fn delete_all(&mut self) -> DownloadResult<()> {
        let mut removed = 0;
        let mut result = Ok(());
        for path in &self.files {
            if let Err(e) = disk::remove_file(path) {
                result = Err(DownloadError::disk("delete", e));
                break;
            }
            removed += 1;
        }
        self.files.drain(..removed);
        log::info!("已删除 {} 个文件，剩余 {} 个", removed, self.files.len());
        self.notify(|view| view.files_deleted());
        result
    }

    /// 计算缓存与磁盘的差异，先逐个通知删除，再逐个通知新增
    pub(super) fn reconcile(&mut self) {
        let actual = match disk::scan_namespace(&self.root) {
            Ok(files) => files,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("目录已不存在，重新创建: {}", self.root.display());
                if let Err(e) = fs::create_dir_all(&self.root) {
                    log::warn!("无法创建目录 {}: {}", self.root.display(), e);
                }
                Vec::new()
            }
            Err(e) => {
                log::warn!("无法扫描目录 {}: {}", self.root.display(), e);
                return;
            }
        };

        let actual_set: HashSet<&PathBuf> = actual.iter().collect();
        let removed: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|f| !actual_set.contains(f))
            .cloned()
            .collect();
        for path in removed {
            if let Some(index) = self.files.iter().position(|f| *f == path) {
                self.files.remove(index);
                log::debug!("外部删除 #{}: {}", index, path.display());
                self.notify(|view| view.file_deleted(index));
            }
        }

        let cached: HashSet<PathBuf> = self.files.iter().cloned().collect();
        for path in actual.into_iter().filter(|f| !cached.contains(f)) {
            log::debug!("外部新增: {}", path.display());
            self.files.push(path);
            let index = self.files.len() - 1;
            self.notify(|view| view.file_imported(index));
        }
    }
}

/// 下载完成的临时文件直接移入文件目录
impl DownloadCompletionHandler for Addr<FileStore> {
    fn download_completed(&self, _index: usize, temp_path: PathBuf, preferred_filename: String) {
        self.do_send(ImportFile {
            source: temp_path,
            preferred_filename: Some(preferred_filename),
            mode: ImportMode::Move,
        });
    }
}
