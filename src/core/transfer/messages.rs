use actix::Message;
use serde::Serialize;
use url::Url;

use crate::core::error::DownloadResult;
use super::state::TransferStatus;

/// 从用户输入的字符串开始下载，成功时返回规范化后的 URL
pub struct BeginDownloadFrom {
    pub input: String,
}
impl Message for BeginDownloadFrom { type Result = DownloadResult<Url>; }

/// 开始下载，URL 已在列表中时什么也不做
pub struct BeginDownload {
    pub url: Url,
}
impl Message for BeginDownload { type Result = (); }

pub struct PauseDownload {
    pub url: Url,
}
impl Message for PauseDownload { type Result = (); }

pub struct ResumeDownload {
    pub url: Url,
}
impl Message for ResumeDownload { type Result = (); }

pub struct CancelDownload {
    pub url: Url,
}
impl Message for CancelDownload { type Result = (); }

pub struct CancelAll;
impl Message for CancelAll { type Result = (); }

/// 查询当前下载列表
pub struct ListDownloads;
impl Message for ListDownloads { type Result = Vec<DownloadSnapshot>; }

/// 重新接管传输层仍在运行的传输（回到前台时发送）
pub struct ReattachTransfers;
impl Message for ReattachTransfers { type Result = (); }

/// 下载列表中的一项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadSnapshot {
    pub url: Url,
    pub status: TransferStatus,
    /// 仅 `Active` 状态有进度
    pub progress: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_url_as_string() {
        let snapshot = DownloadSnapshot {
            url: Url::parse("http://example.com/a.zip").unwrap(),
            status: TransferStatus::Suspended,
            progress: None,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "http://example.com/a.zip", "status": "Suspended", "progress": null})
        );
    }
}
