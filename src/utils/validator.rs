use url::Url;

use crate::core::error::{DownloadError, DownloadResult};

/// 把用户输入规范化为可下载的 URL
///
/// 空字符串、无法解析、本地文件以及没有主机名的地址都会被拒绝；
/// 没有 `://` 的输入按 `http://` 处理。
pub fn normalize_download_url(input: &str) -> DownloadResult<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::InvalidUrl(input.to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate).map_err(|_| DownloadError::InvalidUrl(input.to_string()))?;
    if url.scheme() == "file" || url.host_str().map_or(true, str::is_empty) {
        return Err(DownloadError::InvalidUrl(input.to_string()));
    }
    Ok(url)
}

/// 去掉外部打开时附加的两字符前缀
pub fn strip_scheme_marker<'a>(input: &'a str, prefix: &str) -> &'a str {
    input.strip_prefix(prefix).unwrap_or(input)
}

/// 生成交给下载器打开的地址，只接受 http / https
pub fn make_intake_url(source: &Url, prefix: &str) -> Option<String> {
    match source.scheme() {
        "http" | "https" => Some(format!("{}{}", prefix, source)),
        _ => None,
    }
}
