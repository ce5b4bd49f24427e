use serde::{Deserialize, Serialize};

use crate::core::transport::{ResumeToken, TransferHandle};

/// 单个下载的状态
///
/// `Active → Suspending → Suspended → Active` 可以循环任意次；
/// 取消或完成会把条目整个移出下载列表。
#[derive(Debug, Clone, PartialEq)]
pub enum TransferState {
    Active {
        handle: TransferHandle,
        progress: f64,
    },
    /// 已请求暂停，传输层正在生成续传令牌
    Suspending(TransferHandle),
    Suspended(Option<ResumeToken>),
}

/// 对外展示用的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Active,
    Suspending,
    Suspended,
}

impl TransferState {
    pub fn active(handle: TransferHandle) -> Self {
        TransferState::Active { handle, progress: 0.0 }
    }

    pub fn status(&self) -> TransferStatus {
        match self {
            TransferState::Active { .. } => TransferStatus::Active,
            TransferState::Suspending(_) => TransferStatus::Suspending,
            TransferState::Suspended(_) => TransferStatus::Suspended,
        }
    }

    /// 正在运行的传输句柄（`Active` 或 `Suspending`）
    pub fn live_handle(&self) -> Option<TransferHandle> {
        match self {
            TransferState::Active { handle, .. } | TransferState::Suspending(handle) => Some(*handle),
            TransferState::Suspended(_) => None,
        }
    }

    pub fn active_handle(&self) -> Option<TransferHandle> {
        match self {
            TransferState::Active { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            TransferState::Active { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    /// 记录进度，仅在 `Active` 且句柄一致时生效
    pub fn set_progress(&mut self, from: TransferHandle, fraction: f64) -> bool {
        match self {
            TransferState::Active { handle, progress } if *handle == from => {
                *progress = fraction.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    /// `Active → Suspending`，返回需要暂停的句柄
    pub fn begin_suspend(&mut self) -> Option<TransferHandle> {
        let handle = self.active_handle()?;
        *self = TransferState::Suspending(handle);
        Some(handle)
    }

    /// `Suspending → Suspended`，句柄必须与暂停中的一致
    pub fn finish_suspend(&mut self, from: TransferHandle, token: Option<ResumeToken>) -> bool {
        match self {
            TransferState::Suspending(handle) if *handle == from => {
                *self = TransferState::Suspended(token);
                true
            }
            _ => false,
        }
    }

    /// `Suspended → Active`，`start` 收到续传令牌（可能没有）并返回新句柄
    pub fn resume_with<F>(&mut self, start: F) -> Option<TransferHandle>
    where
        F: FnOnce(Option<ResumeToken>) -> TransferHandle,
    {
        let TransferState::Suspended(token) = self else {
            return None;
        };
        let handle = start(token.take());
        *self = TransferState::active(handle);
        Some(handle)
    }

    /// 移除条目时需要清理的资源
    pub fn into_leftovers(self) -> (Option<TransferHandle>, Option<ResumeToken>) {
        match self {
            TransferState::Active { handle, .. } | TransferState::Suspending(handle) => (Some(handle), None),
            TransferState::Suspended(token) => (None, token),
        }
    }
}
