use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::core::error::DownloadError;
use crate::core::naming::DEFAULT_COLLISION_LIMIT;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 已下载文件所在目录
    pub download_dir: String,
    /// 传输过程中的临时文件与会话记录
    pub temp_dir: String,
    /// 连接与等待响应头的超时时间（秒）
    pub timeout: u64,
    /// 接收整个响应体的超时时间（秒）
    pub transfer_timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 自动跟随的最大重定向次数
    pub max_redirects: u32,
    /// 进度通知的最小间隔（毫秒）
    pub progress_interval_ms: u64,
    /// 前台时对齐文件目录的间隔（秒）
    pub reconcile_interval_secs: u64,
    /// 重名时尝试的最大编号
    pub collision_limit: u32,
    /// 外部打开下载地址时附加的两字符前缀
    pub url_scheme_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: "./downloads".to_string(),
            temp_dir: "./downloads/.transfers".to_string(),
            timeout: 30,
            transfer_timeout: 86400,
            user_agent: format!("Downloads/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            progress_interval_ms: 250,
            reconcile_interval_secs: 2,
            collision_limit: DEFAULT_COLLISION_LIMIT,
            url_scheme_prefix: "dl".to_string(),
        }
    }
}

impl Config {
    /// 加载配置文件，不存在时写入默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("配置文件格式错误: {}，将使用默认配置", e);
                    let config = Config::default();
                    Config::save_with_tutorial(&config, path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Config::default();
            Config::save_with_tutorial(&config, path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    /// 配置文件开头的说明，全部是注释
    fn generate_tutorial_content() -> String {
        r#"# Downloads 配置文件
# ====================
#
# 这是一个 TOML 格式的配置文件，文件末尾是当前生效的配置项。
# 命令行参数会覆盖配置文件中的设置，优先级：命令行 > 配置文件 > 默认值
#
# 使用示例：
#   downloads https://example.com/file.zip                 # 下载到 download_dir
#   downloads dlhttps://example.com/file.zip               # 外部打开的地址，前缀会被去掉
#   downloads -f urls.txt                                  # 从文件读取地址，每行一个
#   downloads -i ~/Desktop/report.pdf                      # 把本地文件复制进下载目录
#   downloads --list                                       # 列出已下载的文件
#   downloads -e                                           # 编辑配置文件
#
# ==================== 目录 ====================
#
# download_dir: 已下载文件所在目录，重名文件会自动改名为 "a 2.txt"、"a 3.txt" …
# temp_dir: 传输中的临时文件与会话记录，程序重启后据此继续未完成的下载
#   建议放在 download_dir 之内并以 "." 开头，这样它不会出现在文件列表里
#
# ==================== 网络 ====================
#
# timeout: 连接与等待响应头的超时时间（秒）
# transfer_timeout: 接收整个文件的超时时间（秒），大文件请适当调大
# user_agent: 某些服务器可能需要特定的 User-Agent
# max_redirects: 自动跟随的最大重定向次数，每次重定向都会提示
#
# ==================== 界面 ====================
#
# progress_interval_ms: 进度刷新的最小间隔（毫秒）
# reconcile_interval_secs: 检查下载目录外部变化的间隔（秒）
# collision_limit: 重名时尝试的最大编号，至少为 2
# url_scheme_prefix: 外部打开下载地址时附加的前缀，必须正好两个字符
#
# ==================== 配置项 ====================
"#
        .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.download_dir.is_empty() {
            return Err(DownloadError::Config("下载目录不能为空".to_string()));
        }
        if self.temp_dir.is_empty() {
            return Err(DownloadError::Config("临时目录不能为空".to_string()));
        }
        if self.timeout == 0 || self.transfer_timeout == 0 {
            return Err(DownloadError::Config("超时时间必须大于0".to_string()));
        }
        if self.progress_interval_ms == 0 || self.reconcile_interval_secs == 0 {
            return Err(DownloadError::Config("刷新间隔必须大于0".to_string()));
        }
        if self.collision_limit < 2 {
            return Err(DownloadError::Config("重名编号上限至少为2".to_string()));
        }
        if self.url_scheme_prefix.chars().count() != 2 {
            return Err(DownloadError::Config(format!(
                "地址前缀必须是两个字符: {:?}",
                self.url_scheme_prefix
            )));
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(dir) = &args.download_dir {
            self.download_dir = dir.clone();
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 下载目录: {}\n\
            - 临时目录: {}\n\
            - 超时时间: {} 秒\n\
            - 最大重定向: {}\n\
            - 目录检查间隔: {} 秒\n\
            - 重名编号上限: {}",
            self.download_dir,
            self.temp_dir,
            self.timeout,
            self.max_redirects,
            self.reconcile_interval_secs,
            self.collision_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.collision_limit, 99);
        assert_eq!(config.url_scheme_prefix, "dl");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.url_scheme_prefix = "dl:".to_string();
        assert!(matches!(config.validate(), Err(DownloadError::Config(_))));

        config = Config::default();
        config.collision_limit = 1;
        assert!(config.validate().is_err());

        config = Config::default();
        config.reconcile_interval_secs = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.download_dir.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("downloads.conf");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.download_dir = "/srv/files".to_string();
        config.save_with_tutorial(path).expect("保存带教程的配置失败");

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Downloads 配置文件"));
        assert!(content.contains("使用示例"));

        let loaded = Config::load(path).expect("加载配置失败");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_and_partial_files() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("new.conf");
        let loaded = Config::load(missing.to_str().unwrap()).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(missing.exists());

        let partial = dir.path().join("partial.conf");
        fs::write(&partial, "timeout = 5\n").unwrap();
        let loaded = Config::load(partial.to_str().unwrap()).unwrap();
        assert_eq!(loaded.timeout, 5);
        assert_eq!(loaded.download_dir, Config::default().download_dir);

        let broken = dir.path().join("broken.conf");
        fs::write(&broken, "timeout = [").unwrap();
        assert_eq!(Config::load(broken.to_str().unwrap()).unwrap(), Config::default());
    }

    #[test]
    fn test_config_summary() {
        let summary = Config::default().get_summary();
        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("./downloads"));
    }
}
