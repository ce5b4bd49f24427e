//! 文件命名策略：为下载完成的文件挑选名字，并在重名时生成候选名

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::transport::ResponseMetadata;

/// 重名时尝试的最大编号
pub const DEFAULT_COLLISION_LIMIT: u32 = 99;

const FALLBACK_FILENAME: &str = "file";

/// MIME 类型到扩展名的对照表
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/gzip", "gz"),
    ("application/json", "json"),
    ("application/msword", "doc"),
    ("application/octet-stream", "bin"),
    ("application/pdf", "pdf"),
    ("application/rtf", "rtf"),
    ("application/vnd.apple.mpegurl", "m3u8"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.ms-powerpoint", "ppt"),
    ("application/vnd.openxmlformats-officedocument.presentationml.presentation", "pptx"),
    ("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", "xlsx"),
    ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "docx"),
    ("application/x-7z-compressed", "7z"),
    ("application/x-bzip2", "bz2"),
    ("application/x-rar-compressed", "rar"),
    ("application/x-tar", "tar"),
    ("application/xml", "xml"),
    ("application/zip", "zip"),
    ("audio/aac", "aac"),
    ("audio/flac", "flac"),
    ("audio/mp4", "m4a"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "oga"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("image/bmp", "bmp"),
    ("image/gif", "gif"),
    ("image/heic", "heic"),
    ("image/jpeg", "jpeg"),
    ("image/png", "png"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tiff"),
    ("image/webp", "webp"),
    ("text/css", "css"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/javascript", "js"),
    ("text/markdown", "md"),
    ("text/plain", "txt"),
    ("video/3gpp", "3gp"),
    ("video/mp2t", "ts"),
    ("video/mp4", "mp4"),
    ("video/mpeg", "mpeg"),
    ("video/ogg", "ogv"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-flv", "flv"),
    ("video/x-matroska", "mkv"),
    ("video/x-msvideo", "avi"),
];

/// 查询参数中和命名有关的两个字段，互不影响
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryHints {
    pub title: Option<String>,
    pub extension: Option<String>,
}

impl QueryHints {
    /// 从 URL 的查询串中提取 `title`/`name` 与 `mime`
    pub fn from_url(url: &Url) -> Self {
        let mut hints = QueryHints::default();
        let Some(query) = url.query() else {
            return hints;
        };
        for param in query.split('&') {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            match key {
                "title" | "name" => {
                    let title = decode_component(&value.replace('+', " "));
                    if !title.trim().is_empty() {
                        hints.title = Some(sanitize_filename(&title));
                    }
                }
                "mime" => {
                    let mime = decode_component(value);
                    hints.extension = extension_for_mime(&mime).map(str::to_string);
                }
                _ => {}
            }
        }
        hints
    }
}

/// 为完成的下载推导文件名
///
/// 文件名优先级：请求 URL 的 `title`/`name` 参数、服务器建议的文件名、
/// 响应 URL 的最后一段路径、`"file"`。扩展名单独来自 `mime` 参数。
pub fn preferred_filename(response: &ResponseMetadata) -> String {
    let hints = QueryHints::from_url(&response.request_url);
    let title = hints
        .title
        .or_else(|| {
            response
                .suggested_filename
                .as_deref()
                .map(sanitize_filename)
                .filter(|name| !name.is_empty())
        })
        .or_else(|| response.response_url.as_ref().and_then(last_path_segment))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    match hints.extension {
        Some(ext) => match split_extension(&title) {
            (_, Some(current)) if current.eq_ignore_ascii_case(&ext) => title,
            _ => format!("{}.{}", title, ext),
        },
        None => title,
    }
}

/// 按 MIME 类型查扩展名，忽略大小写和参数
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or("").trim();
    MIME_EXTENSIONS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

// `filename*=UTF-8''...`
fn extended_filename_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?i)filename\*\s*=\s*[^']*'[^']*'([^;\s]+)"#).ok())
        .as_ref()
}

fn plain_filename_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^;\s]+))"#).ok())
        .as_ref()
}

/// 从 Content-Disposition 头中取文件名，`filename*` 优先
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let extended = extended_filename_pattern()?;
    if let Some(caps) = extended.captures(header) {
        let name = decode_component(&caps[1]);
        let name = sanitize_filename(&name);
        if !name.is_empty() {
            return Some(name);
        }
    }

    let plain = plain_filename_pattern()?;
    let caps = plain.captures(header)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str().replace("\\\"", "\"");
    let name = sanitize_filename(&raw);
    (!name.is_empty()).then_some(name)
}

/// 拆出扩展名；隐藏文件（如 `.profile`）视为没有扩展名
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// 重名时依次尝试的候选名：`a 2.txt`、`a 3.txt` …
pub fn collision_candidates(name: &str, limit: u32) -> impl Iterator<Item = String> + '_ {
    let (stem, ext) = split_extension(name);
    (2..=limit).map(move |num| match ext {
        Some(ext) => format!("{} {}.{}", stem, num, ext),
        None => format!("{} {}", stem, num),
    })
}

/// 返回第一个未被占用的名字，编号用尽时报告 `ImportCollision`
pub fn resolve_collision_free_name<F>(name: &str, limit: u32, exists: F) -> DownloadResult<String>
where
    F: Fn(&str) -> bool,
{
    if !exists(name) {
        return Ok(name.to_string());
    }
    collision_candidates(name, limit)
        .find(|candidate| !exists(candidate))
        .ok_or_else(|| DownloadError::ImportCollision(name.to_string()))
}

fn last_path_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let name = sanitize_filename(&decode_component(segment));
    (!name.is_empty()).then_some(name)
}

fn decode_component(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// 文件名里不能出现路径分隔符
/// 只保留最后一段路径，去掉控制字符；`.` 和 `..` 变成空串
pub fn sanitize_filename(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let name = name
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string();
    if name == "." || name == ".." {
        String::new()
    } else {
        name
    }
}
