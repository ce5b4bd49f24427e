//! `transport` 模块负责实际的网络传输
//!
//! 主要包括：
//! - `Transport`: 下载管理器与传输实现之间的接口
//! - `http`: 基于 awc 的 HTTP 传输实现
//! - `session`: 传输会话的持久化，用于冷启动后找回进行中的传输
//! - `buffer`: 写入临时文件的缓冲区

pub mod buffer;
pub mod http;
pub mod session;
#[cfg(test)]
pub(crate) mod mock;

use actix::{Message, Recipient};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

use crate::core::error::DownloadError;

pub use http::HttpTransport;

/// 传输句柄，标识一次正在进行的传输
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferHandle(Uuid);

impl TransferHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 断点续传令牌，内容只有产生它的传输实现能解读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken(Bytes);

impl ResumeToken {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// 启动传输的请求
#[derive(Debug, Clone)]
pub enum TransferRequest {
    Fresh(Url),
    Resume { url: Url, token: ResumeToken },
}

impl TransferRequest {
    pub fn url(&self) -> &Url {
        match self {
            TransferRequest::Fresh(url) => url,
            TransferRequest::Resume { url, .. } => url,
        }
    }
}

/// 下载完成时的响应信息，用于推导文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    /// 最初请求的 URL
    pub request_url: Url,
    /// 跟随重定向之后的 URL
    pub response_url: Option<Url>,
    /// 服务器建议的文件名（Content-Disposition）
    pub suggested_filename: Option<String>,
    pub mime_type: Option<String>,
}

impl ResponseMetadata {
    pub fn new(request_url: Url) -> Self {
        Self {
            request_url,
            response_url: None,
            suggested_filename: None,
            mime_type: None,
        }
    }
}

/// 冷启动后传输层仍然记得的传输
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTransfer {
    pub handle: TransferHandle,
    pub url: Url,
}

/// 传输层回调，全部以消息的形式送回下载管理器
#[derive(Debug)]
pub enum TransportEvent {
    Progress {
        handle: TransferHandle,
        fraction: f64,
    },
    WaitingForConnectivity {
        handle: TransferHandle,
    },
    Redirected {
        handle: TransferHandle,
        location: String,
    },
    /// 对 `Transport::suspend` 的应答
    ResumeData {
        handle: TransferHandle,
        token: Option<ResumeToken>,
    },
    /// 数据已全部写入 `payload`
    Finished {
        handle: TransferHandle,
        payload: PathBuf,
        response: ResponseMetadata,
    },
    /// 传输结束，每个句柄最后一条事件
    Completed {
        handle: TransferHandle,
        error: Option<DownloadError>,
    },
    SessionInvalidated {
        reason: String,
    },
}
impl Message for TransportEvent { type Result = (); }

/// 下载管理器使用的传输接口
///
/// 实现者不直接修改下载列表，所有结果都通过 `events` 投递回管理器。
pub trait Transport {
    /// 创建并立即启动一次传输
    fn start(&self, request: TransferRequest, events: Recipient<TransportEvent>) -> TransferHandle;

    /// 取消传输并尽量产生续传令牌，结果以 `TransportEvent::ResumeData` 送回
    fn suspend(&self, handle: TransferHandle);

    /// 取消传输，不保留任何数据
    fn cancel(&self, handle: TransferHandle);

    /// 丢弃一个不再需要的续传令牌及其占用的数据
    fn discard(&self, token: &ResumeToken);

    /// 列出传输层自己保存的传输（包括上次运行遗留的）
    fn live_transfers(&self) -> Vec<LiveTransfer>;

    /// 让 `live_transfers` 返回的传输继续运行
    fn resume_live(&self, handle: TransferHandle, events: Recipient<TransportEvent>) -> bool;
}
