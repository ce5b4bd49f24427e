use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("下载失败: {reason}")]
    TransferFailed {
        reason: String,
    },

    #[error("File named \"{0}\" already exists")]
    ImportCollision(String),

    #[error("磁盘操作失败 ({operation}): {cause}")]
    DiskError {
        operation: &'static str,
        #[source]
        cause: io::Error,
    },

    #[error("下载被取消")]
    Cancelled,

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
}

impl DownloadError {
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        DownloadError::TransferFailed { reason: reason.into() }
    }

    pub fn disk(operation: &'static str, cause: io::Error) -> Self {
        DownloadError::DiskError { operation, cause }
    }

    /// 本端主动取消导致的错误，不需要提示用户
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }

    /// 交给错误提示的标题
    pub fn title(&self) -> String {
        match self {
            DownloadError::InvalidUrl(_) => "Invalid URL".to_string(),
            DownloadError::TransferFailed { reason } => format!("Download Failed - {}", reason),
            DownloadError::ImportCollision(_) => "Import Error".to_string(),
            DownloadError::DiskError { operation, .. } => match *operation {
                "delete" => "Deletion Error".to_string(),
                _ => "Import Error".to_string(),
            },
            DownloadError::Cancelled => "Cancelled".to_string(),
            DownloadError::Config(_) => "Configuration Error".to_string(),
            DownloadError::Io(_) => "IO Error".to_string(),
        }
    }

    /// 交给错误提示的正文
    pub fn message(&self) -> String {
        match self {
            DownloadError::InvalidUrl(url) => url.clone(),
            DownloadError::DiskError { cause, .. } => cause.to_string(),
            other => other.to_string(),
        }
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
