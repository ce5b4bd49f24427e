//! 测试用传输：记录调用，事件由测试手动投递

use actix::Recipient;
use std::cell::RefCell;
use url::Url;

use super::{LiveTransfer, ResumeToken, TransferHandle, TransferRequest, Transport, TransportEvent};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TransportCall {
    Start {
        handle: TransferHandle,
        url: Url,
        token: Option<ResumeToken>,
    },
    Suspend(TransferHandle),
    Cancel(TransferHandle),
    Discard(ResumeToken),
    ResumeLive(TransferHandle),
}

#[derive(Default)]
pub(crate) struct MockTransport {
    calls: RefCell<Vec<TransportCall>>,
    live: RefCell<Vec<LiveTransfer>>,
}

impl MockTransport {
    pub(crate) fn with_live(live: Vec<LiveTransfer>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            live: RefCell::new(live),
        }
    }

    pub(crate) fn calls(&self) -> Vec<TransportCall> {
        self.calls.borrow().clone()
    }

    /// 按顺序返回所有已启动的句柄
    pub(crate) fn started(&self) -> Vec<TransferHandle> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Start { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_started(&self) -> TransferHandle {
        *self.started().last().expect("no transfer started")
    }
}

impl Transport for MockTransport {
    fn start(&self, request: TransferRequest, _events: Recipient<TransportEvent>) -> TransferHandle {
        let handle = TransferHandle::new();
        let (url, token) = match request {
            TransferRequest::Fresh(url) => (url, None),
            TransferRequest::Resume { url, token } => (url, Some(token)),
        };
        self.calls.borrow_mut().push(TransportCall::Start { handle, url, token });
        handle
    }

    fn suspend(&self, handle: TransferHandle) {
        self.calls.borrow_mut().push(TransportCall::Suspend(handle));
    }

    fn cancel(&self, handle: TransferHandle) {
        self.calls.borrow_mut().push(TransportCall::Cancel(handle));
    }

    fn discard(&self, token: &ResumeToken) {
        self.calls.borrow_mut().push(TransportCall::Discard(token.clone()));
    }

    fn live_transfers(&self) -> Vec<LiveTransfer> {
        self.live.borrow().clone()
    }

    fn resume_live(&self, handle: TransferHandle, _events: Recipient<TransportEvent>) -> bool {
        self.calls.borrow_mut().push(TransportCall::ResumeLive(handle));
        self.live.borrow().iter().any(|live| live.handle == handle)
    }
}
