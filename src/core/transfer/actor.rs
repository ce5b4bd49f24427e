use actix::prelude::*;
use std::rc::{Rc, Weak};
use url::Url;

use crate::core::error::DownloadError;
use crate::core::transport::{TransferHandle, TransferRequest, Transport};
use crate::core::views::{DownloadCompletionHandler, DownloadProgressView, ErrorReporter, LogReporter};
use super::registry::DownloadRegistry;
use super::state::TransferState;

/// 下载管理器 Actor
///
/// 下载列表只在本 Actor 的消息处理中修改；传输层的回调以 `TransportEvent`
/// 消息送回，和用户命令排在同一个邮箱里依次处理。
pub struct DownloadManager {
    pub(super) transport: Rc<dyn Transport>,
    pub(super) registry: DownloadRegistry,
    view: Option<Weak<dyn DownloadProgressView>>,
    pub(super) completion: Option<Box<dyn DownloadCompletionHandler>>,
}

impl Actor for DownloadManager {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        log::info!("下载管理器已启动");
        // 在处理任何消息之前接管上次遗留的传输
        self.reattach_live_transfers(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        log::info!("下载管理器已停止，列表中还有 {} 个下载", self.registry.len());
    }
}

impl DownloadManager {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: DownloadRegistry::new(),
            view: None,
            completion: None,
        }
    }

    /// 视图只以弱引用持有，视图释放后所有通知自动变为空操作
    pub fn with_view(mut self, view: Weak<dyn DownloadProgressView>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_completion_handler<H>(mut self, handler: H) -> Self
    where
        H: DownloadCompletionHandler + 'static,
    {
        self.completion = Some(Box::new(handler));
        self
    }

    fn view(&self) -> Option<Rc<dyn DownloadProgressView>> {
        self.view.as_ref().and_then(Weak::upgrade)
    }

    pub(super) fn notify<F>(&self, f: F)
    where
        F: FnOnce(&dyn DownloadProgressView),
    {
        if let Some(view) = self.view() {
            f(view.as_ref());
        }
    }

    pub(super) fn report(&self, message: &str, title: &str) {
        match self.view() {
            Some(view) => {
                log::warn!("{}: {}", title, message);
                view.report_error(message, title);
            }
            None => LogReporter.report_error(message, title),
        }
    }

    pub(super) fn report_download_error(&self, error: &DownloadError) {
        self.report(&error.message(), &error.title());
    }

    pub(super) fn begin(&mut self, url: Url, ctx: &mut Context<Self>) {
        if self.registry.contains(&url) {
            log::debug!("已在下载列表中: {}", url);
            return;
        }
        let handle = self
            .transport
            .start(TransferRequest::Fresh(url.clone()), ctx.address().recipient());
        log::info!("开始下载 {}: {}", handle, url);
        if let Some(index) = self.registry.insert(url, TransferState::active(handle)) {
            self.notify(|view| view.download_began(index));
        }
    }

    /// 取消并移除一个条目，返回它被移除时的位置
    pub(super) fn remove_entry(&mut self, url: &Url) -> Option<usize> {
        let (index, state) = self.registry.remove(url)?;
        log::info!("移除下载 #{}: {}", index, url);
        self.release(state);
        self.notify(|view| view.download_cancelled(index));
        Some(index)
    }

    pub(super) fn remove_all(&mut self) {
        let states = self.registry.clear();
        log::info!("取消全部下载，共 {} 个", states.len());
        for state in states {
            self.release(state);
        }
        self.notify(|view| view.downloads_cancelled());
    }

    /// 停止仍在运行的传输，丢弃已不需要的续传数据
    fn release(&self, state: TransferState) {
        let (handle, token) = state.into_leftovers();
        if let Some(handle) = handle {
            self.transport.cancel(handle);
        }
        if let Some(token) = token {
            self.transport.discard(&token);
        }
    }

    /// 传输失败：按取消的方式移除条目，再以失败的地址提示用户
    pub(super) fn fail_transfer(&mut self, handle: TransferHandle, error: DownloadError) {
        let url = self.registry.find_live(handle).map(|(_, url)| url.clone());
        match url {
            Some(url) => {
                self.remove_entry(&url);
                log::debug!("传输失败 {}: {}", url, error);
                self.report(url.as_str(), &error.title());
            }
            None => log::warn!("已不在列表中的传输 {} 出错: {}", handle, error),
        }
    }

    pub(super) fn reattach_live_transfers(&mut self, ctx: &mut Context<Self>) {
        for live in self.transport.live_transfers() {
            match self.registry.get(&live.url) {
                Some(state) if state.live_handle() == Some(live.handle) => {}
                Some(_) => {
                    log::warn!("重复的传输 {}，已取消: {}", live.handle, live.url);
                    self.transport.cancel(live.handle);
                }
                None => {
                    if !self.transport.resume_live(live.handle, ctx.address().recipient()) {
                        log::warn!("无法恢复传输 {}: {}", live.handle, live.url);
                        continue;
                    }
                    log::info!("接管传输 {}: {}", live.handle, live.url);
                    if let Some(index) = self.registry.insert(live.url, TransferState::active(live.handle)) {
                        self.notify(|view| view.download_began(index));
                    }
                }
            }
        }
    }
}
