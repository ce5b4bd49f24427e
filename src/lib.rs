//! 个人下载管理器
//!
//! - `core`: 下载管理器、文件目录与传输层
//! - `config`: TOML 配置
//! - `cli`: 命令行参数
//! - `ui`: 终端界面
//! - `utils`: 日志与地址校验

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;

pub mod utils {
    pub mod logger;
    pub mod validator;
}
