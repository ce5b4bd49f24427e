use actix::prelude::*;
use std::fs;
use std::rc::Rc;

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::naming;
use crate::core::transport::{TransferRequest, TransportEvent};
use crate::utils::validator::normalize_download_url;
use super::actor::DownloadManager;
use super::messages::*;
use super::state::TransferStatus;

impl Handler<BeginDownloadFrom> for DownloadManager {
    type Result = DownloadResult<url::Url>;
    fn handle(&mut self, msg: BeginDownloadFrom, ctx: &mut Self::Context) -> Self::Result {
        match normalize_download_url(&msg.input) {
            Ok(url) => {
                self.begin(url.clone(), ctx);
                Ok(url)
            }
            Err(e) => {
                self.report_download_error(&e);
                Err(e)
            }
        }
    }
}

impl Handler<BeginDownload> for DownloadManager {
    type Result = ();
    fn handle(&mut self, msg: BeginDownload, ctx: &mut Self::Context) {
        self.begin(msg.url, ctx);
    }
}

impl Handler<PauseDownload> for DownloadManager {
    type Result = ();
    fn handle(&mut self, msg: PauseDownload, _ctx: &mut Self::Context) {
        let Some((index, state)) = self.registry.get_full_mut(&msg.url) else {
            return;
        };
        let Some(handle) = state.begin_suspend() else {
            log::debug!("不是进行中的下载，忽略暂停: {}", msg.url);
            return;
        };
        // 先通知视图，传输层的确认稍后以 ResumeData 送回
        self.notify(|view| view.download_paused(index));
        self.transport.suspend(handle);
    }
}

impl Handler<ResumeDownload> for DownloadManager {
    type Result = ();
    fn handle(&mut self, msg: ResumeDownload, ctx: &mut Self::Context) {
        let transport = Rc::clone(&self.transport);
        let events = ctx.address().recipient();
        let url = msg.url;
        let Some((index, state)) = self.registry.get_full_mut(&url) else {
            return;
        };
        let resumed = state.resume_with(|token| {
            let request = match token {
                Some(token) => TransferRequest::Resume { url: url.clone(), token },
                None => TransferRequest::Fresh(url.clone()),
            };
            transport.start(request, events)
        });
        match resumed {
            Some(handle) => {
                log::info!("继续下载 {}: {}", handle, url);
                self.notify(|view| view.download_resumed(index));
            }
            None => log::debug!("不是已暂停的下载，忽略继续: {}", url),
        }
    }
}

impl Handler<CancelDownload> for DownloadManager {
    type Result = ();
    fn handle(&mut self, msg: CancelDownload, _ctx: &mut Self::Context) {
        self.remove_entry(&msg.url);
    }
}

impl Handler<CancelAll> for DownloadManager {
    type Result = ();
    fn handle(&mut self, _msg: CancelAll, _ctx: &mut Self::Context) {
        self.remove_all();
    }
}

impl Handler<ListDownloads> for DownloadManager {
    type Result = MessageResult<ListDownloads>;
    fn handle(&mut self, _msg: ListDownloads, _ctx: &mut Self::Context) -> Self::Result {
        let snapshot = self
            .registry
            .iter()
            .map(|(url, state)| DownloadSnapshot {
                url: url.clone(),
                status: state.status(),
                progress: state.progress(),
            })
            .collect();
        MessageResult(snapshot)
    }
}

impl Handler<ReattachTransfers> for DownloadManager {
    type Result = ();
    fn handle(&mut self, _msg: ReattachTransfers, ctx: &mut Self::Context) {
        self.reattach_live_transfers(ctx);
    }
}

impl Handler<TransportEvent> for DownloadManager {
    type Result = ();
    fn handle(&mut self, event: TransportEvent, _ctx: &mut Self::Context) {
        match event {
            TransportEvent::Progress { handle, fraction } => {
                let Some((index, state)) = self.registry.find_live_mut(handle) else {
                    log::debug!("忽略已移除传输的进度: {}", handle);
                    return;
                };
                if state.set_progress(handle, fraction) {
                    let fraction = fraction.clamp(0.0, 1.0);
                    self.notify(|view| view.progressed(index, fraction));
                }
            }
            TransportEvent::WaitingForConnectivity { handle } => {
                self.fail_transfer(handle, DownloadError::transfer_failed("No Connection"));
            }
            TransportEvent::Redirected { handle, location } => {
                if self.registry.find_live(handle).is_some() {
                    self.report(&location, "Redirected");
                }
            }
            TransportEvent::ResumeData { handle, token } => {
                if let Some((_, state)) = self.registry.find_live_mut(handle) {
                    if state.finish_suspend(handle, token.clone()) {
                        log::info!("下载已暂停 {}: 续传令牌{}", handle, if token.is_some() { "可用" } else { "不可用" });
                        return;
                    }
                }
                // 条目已被取消，续传数据没有人再需要
                if let Some(token) = token {
                    self.transport.discard(&token);
                }
            }
            TransportEvent::Finished { handle, payload, response } => {
                let url = self.registry.find_live(handle).map(|(_, url)| url.clone());
                let Some((index, _)) = url.and_then(|url| self.registry.remove(&url)) else {
                    log::warn!("已移除的传输 {} 仍然完成了，删除临时文件", handle);
                    if let Err(e) = fs::remove_file(&payload) {
                        log::warn!("无法删除临时文件 {}: {}", payload.display(), e);
                    }
                    return;
                };
                let filename = naming::preferred_filename(&response);
                log::info!("下载 #{} 完成: {} -> {}", index, response.request_url, filename);
                match &self.completion {
                    Some(handler) => handler.download_completed(index, payload, filename),
                    None => log::warn!("没有完成处理者，临时文件保留在 {}", payload.display()),
                }
            }
            TransportEvent::Completed { handle, error: None } => {
                log::debug!("传输结束: {}", handle);
            }
            TransportEvent::Completed { handle, error: Some(error) } => {
                let status = self.registry.find_live(handle).and_then(|(_, url)| self.registry.get(url)).map(|s| s.status());
                match status {
                    None if error.is_cancellation() => log::debug!("传输已取消: {}", handle),
                    None => log::warn!("已不在列表中的传输 {} 出错: {}", handle, error),
                    Some(TransferStatus::Suspending) => {
                        // 暂停过程中传输结束但没有给出续传数据，只能从头开始
                        if let Some((_, state)) = self.registry.find_live_mut(handle) {
                            state.finish_suspend(handle, None);
                        }
                        log::info!("下载已暂停 {}: 续传令牌不可用 ({})", handle, error);
                    }
                    Some(_) if error.is_cancellation() => {
                        let url = self.registry.find_live(handle).map(|(_, url)| url.clone());
                        if let Some(url) = url {
                            self.remove_entry(&url);
                        }
                    }
                    Some(_) => self.fail_transfer(handle, error),
                }
            }
            TransportEvent::SessionInvalidated { reason } => {
                self.report(&reason, "Session Error");
            }
        }
    }
}
