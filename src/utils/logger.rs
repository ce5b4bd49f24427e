use chrono::Local; // 用于获取本地时间
use env_logger::{Builder, Env};
use log::LevelFilter; // 用于设置日志级别
use std::io::Write;

/// 初始化全局日志
///
/// 设置了 `RUST_LOG` 时以环境变量为准，否则使用 `level`。
/// 重复调用不会报错，只保留第一次的设置。
pub fn init_logger(level: LevelFilter) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level.as_str()));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });
    if builder.try_init().is_err() {
        log::debug!("日志已经初始化");
    }
}

/// 命令行 `-v` 的次数对应的日志级别
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
