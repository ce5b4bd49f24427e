//! CLI: 命令行接口和参数解析模块
//!
//! ## 支持的命令
//!
//! - 基本下载：`downloads <url>`，地址可以带外部打开时的两字符前缀
//! - 批量下载：`downloads -f urls.txt`
//! - 导入本地文件：`downloads -i report.pdf`
//! - 列出已下载文件：`downloads --list`
//! - 生成交给下载器打开的地址：`downloads --share https://example.com/a.zip`
//! - 编辑配置：`downloads -e`
//! - 指定配置：`downloads -c config.conf <url>`
//!
//! ## 平台支持
//!
//! - Windows: `%APPDATA%/downloads/downloads.conf`
//! - macOS: `~/Library/Application Support/downloads/downloads.conf`
//! - Linux: `~/.config/downloads/downloads.conf`

use clap::{ArgAction, Parser};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator::{make_intake_url, normalize_download_url, strip_scheme_marker};

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/downloads/downloads.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/downloads/downloads.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/downloads/downloads.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// Downloads 命令行参数
///
/// 示例用法：
///   downloads https://example.com/file.zip
///   downloads -e  # 编辑配置文件
///   downloads -i ~/Desktop/report.pdf
///
/// 更多用法请加 --help 查看
#[derive(Parser, Debug, Clone)]
#[command(
    name = "downloads",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "个人下载管理器：后台下载、暂停/继续、自动整理到下载目录",
    long_about = "下载完成的文件会移动到下载目录，重名时自动改名；程序重启后会继续上次未完成的下载。\n\n按键：p 暂停全部  r 继续全部  c 取消全部  x 删除全部已下载文件  q 退出\n"
)]
pub struct Args {
    /// 要下载的URL列表（可同时指定多个）
    #[arg(required = false, help = "要下载的URL列表，可以带外部打开时的两字符前缀。")]
    pub urls: Vec<String>,

    /// 包含URL列表的文件路径
    #[arg(short, long, help = "包含URL列表的文件路径，每行一个URL，# 开头为注释。")]
    pub file: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 指定下载目录
    #[arg(long, short = 'd', help = "指定下载目录，覆盖配置文件中的设置。")]
    pub download_dir: Option<String>,

    /// 复制进下载目录的本地文件
    #[arg(long, short = 'i', help = "把本地文件复制进下载目录，可以指定多次。")]
    pub import: Vec<PathBuf>,

    /// 列出已下载文件并退出
    #[arg(long, help = "列出下载目录中的文件并退出。")]
    pub list: bool,

    /// 打印带前缀的地址并退出
    #[arg(long, value_name = "URL", help = "打印交给下载器打开的地址（加上两字符前缀）并退出，只接受 http/https。")]
    pub share: Option<String>,

    /// 日志详细程度
    #[arg(short, long, action = ArgAction::Count, help = "输出更详细的日志，可以重复，如 -vv。")]
    pub verbose: u8,
}

impl Args {
    /// 解析命令行参数并加载配置；`-e` 时打开编辑器后直接退出
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();
        let config = args.load_config()?;

        if args.edit_config {
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }
        Ok((args, config))
    }

    /// 加载或创建配置文件，合并命令行参数后校验
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)
            .map_err(|e| DownloadError::Config(format!("无法读取配置文件 {}: {}", self.config, e)))?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }

    /// `--share` 指定的地址加上前缀；没有指定时返回 None
    pub fn share_url(&self, prefix: &str) -> Result<Option<String>, DownloadError> {
        let Some(input) = &self.share else {
            return Ok(None);
        };
        let url = normalize_download_url(input)?;
        make_intake_url(&url, prefix)
            .map(Some)
            .ok_or_else(|| DownloadError::InvalidUrl(input.clone()))
    }

    /// 命令行与文件中的地址，已去掉两字符前缀
    pub fn get_urls(&self, prefix: &str) -> Result<Vec<String>, DownloadError> {
        let mut urls: Vec<String> = self
            .urls
            .iter()
            .map(|url| strip_scheme_marker(url, prefix).to_string())
            .collect();

        if let Some(file_path) = &self.file {
            if !Path::new(file_path).exists() {
                return Err(DownloadError::Config(format!("URL文件不存在: {}", file_path)));
            }
            let content = fs::read_to_string(file_path)?;
            // 按行读取URL，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    urls.push(strip_scheme_marker(line, prefix).to_string());
                }
            }
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["downloads", "-vv", "-i", "a.pdf", "-i", "b.pdf", "https://example.com/file.zip"]).unwrap();
        assert_eq!(args.urls, vec!["https://example.com/file.zip"]);
        assert_eq!(args.import, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
        assert_eq!(args.verbose, 2);
        assert!(!args.list);
        assert!(args.download_dir.is_none());
    }

    #[test]
    fn test_config_loading() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("downloads.conf");
        let config_path = config_path.to_str().unwrap();

        let args = Args::try_parse_from(["downloads", "-c", config_path, "-d", "/tmp/files", "--list"]).unwrap();
        let config = args.load_config().unwrap();

        assert_eq!(config.download_dir, "/tmp/files");
        assert!(args.list);
        assert!(Path::new(config_path).exists());
    }

    #[test]
    fn test_url_file_parsing() {
        let dir = tempdir().unwrap();
        let url_file = dir.path().join("urls.txt");
        let content = "# 这是一个注释\nhttps://example.com/file1.zip\n\ndlhttps://example.com/file2.zip\n";
        fs::write(&url_file, content).unwrap();

        let args = Args::try_parse_from(["downloads", "-f", url_file.to_str().unwrap(), "dlexample.com/a"]).unwrap();
        let urls = args.get_urls("dl").unwrap();
        assert_eq!(
            urls,
            vec!["example.com/a", "https://example.com/file1.zip", "https://example.com/file2.zip"]
        );
    }

    #[test]
    fn test_share_url() {
        let args = Args::try_parse_from(["downloads", "--share", "example.com/a.zip"]).unwrap();
        assert_eq!(args.share_url("dl").unwrap().as_deref(), Some("dlhttp://example.com/a.zip"));

        let args = Args::try_parse_from(["downloads", "--share", "ftp://example.com/a.zip"]).unwrap();
        assert!(matches!(args.share_url("dl"), Err(DownloadError::InvalidUrl(_))));

        let args = Args::try_parse_from(["downloads"]).unwrap();
        assert_eq!(args.share_url("dl").unwrap(), None);
    }

    #[test]
    fn test_missing_url_file() {
        let args = Args::try_parse_from(["downloads", "-f", "/nonexistent/urls.txt"]).unwrap();
        assert!(matches!(args.get_urls("dl"), Err(DownloadError::Config(_))));
    }
}
