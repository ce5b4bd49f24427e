use actix::prelude::*;
use anyhow::Context as _;
use crossterm::{
    cursor, execute, terminal,
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode},
};
use std::rc::Rc;
use std::time::{Duration, Instant};

use downloads::cli;
use downloads::core::store::{DeleteAll, FileStore, ImportFile, ImportMode, ListFiles, SetForeground};
use downloads::core::transfer::{
    BeginDownloadFrom, CancelAll, DownloadManager, ListDownloads, PauseDownload, ReattachTransfers,
    ResumeDownload, TransferStatus,
};
use downloads::core::views::{DownloadProgressView, DownloadedFileView};
use downloads::core::HttpTransport;
use downloads::ui::{self, CompletionRelay, DownloadSummary, ProgressManager, TerminalView};
use downloads::utils::logger::{init_logger, level_from_verbosity};

const SYNC_INTERVAL: Duration = Duration::from_millis(200);
const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // 解析参数和配置
    let (args, config) = cli::Args::parse_args().context("参数解析失败")?;
    init_logger(level_from_verbosity(args.verbose));
    log::info!(
        "程序启动 v{} ({} 构建于 {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    );
    log::info!("配置文件路径: {}", args.config);
    log::info!("{}", config.get_summary());

    if let Some(link) = args.share_url(&config.url_scheme_prefix)? {
        println!("{}", link);
        return Ok(());
    }

    let store = FileStore::open(&config.download_dir, config.collision_limit, config.reconcile_interval())
        .with_context(|| format!("无法打开下载目录 {}", config.download_dir))?;

    log::info!("下载目录: {}", store.root().display());

    if args.list {
        for path in store.files() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let urls = args.get_urls(&config.url_scheme_prefix).context("获取URL列表失败")?;
    let started = Instant::now();

    let view = Rc::new(TerminalView::new(ProgressManager::new(), store.files().len()));
    let file_view: Rc<dyn DownloadedFileView> = view.clone();
    let progress_view: Rc<dyn DownloadProgressView> = view.clone();
    let store = store.with_view(Rc::downgrade(&file_view)).start();

    import_local_files(&store, &args).await?;

    let transport = Rc::new(HttpTransport::new(&config).context("无法初始化传输层")?);
    let manager = DownloadManager::new(transport)
        .with_view(Rc::downgrade(&progress_view))
        .with_completion_handler(CompletionRelay::new(store.clone(), Rc::downgrade(&view)))
        .start();

    for url in urls {
        if let Ok(Ok(accepted)) = manager.send(BeginDownloadFrom { input: url }).await {
            log::info!("已加入下载: {}", accepted);
        }
    }
    store.do_send(SetForeground(true));

    if manager.send(ListDownloads).await?.is_empty() {
        ui::print_success(&format!("没有进行中的下载，下载目录中共 {} 个文件", view.files()));
        return Ok(());
    }

    println!("\n开始下载... (p 暂停, r 继续, c 取消, x 删除已下载文件, q 退出)");
    run_download_loop(&manager, &store, &view).await?;

    // 等文件目录处理完已投递的导入
    let files = store.send(ListFiles).await?;
    let unfinished = manager.send(ListDownloads).await?.len();
    print!(
        "{}",
        DownloadSummary {
            unfinished,
            files: files.len(),
            elapsed_time: started.elapsed(),
        }
    );
    log::info!("程序退出，未完成 {} 个，文件 {} 个", unfinished, files.len());
    Ok(())
}

/// `-i` 指定的本地文件复制进下载目录
async fn import_local_files(store: &Addr<FileStore>, args: &cli::Args) -> anyhow::Result<()> {
    for source in &args.import {
        let result = store
            .send(ImportFile {
                source: source.clone(),
                preferred_filename: None,
                mode: ImportMode::Copy,
            })
            .await?;
        match result {
            Ok(Some(dest)) => ui::print_success(&format!("已导入: {}", dest.display())),
            Ok(None) => ui::print_success(&format!("已在下载目录中: {}", source.display())),
            Err(e) => ui::print_error(&format!("导入失败 {}: {}", source.display(), e)),
        }
    }
    Ok(())
}

/// 运行下载主循环
async fn run_download_loop(
    manager: &Addr<DownloadManager>,
    store: &Addr<FileStore>,
    view: &TerminalView,
) -> anyhow::Result<()> {
    // 设置终端
    terminal::enable_raw_mode()?;
    execute!(std::io::stdout(), cursor::Hide, EnableFocusChange)?;

    let result = poll_until_done(manager, store, view).await;

    // 恢复终端
    execute!(std::io::stdout(), DisableFocusChange, cursor::Show)?;
    terminal::disable_raw_mode()?;
    result
}

async fn poll_until_done(
    manager: &Addr<DownloadManager>,
    store: &Addr<FileStore>,
    view: &TerminalView,
) -> anyhow::Result<()> {
    let mut last_sync = Instant::now();
    loop {
        // 处理键盘输入，不阻塞 actix 线程
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key_event) => match key_event.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => {
                        log::info!("用户主动退出");
                        return Ok(());
                    }
                    KeyCode::Char('p') | KeyCode::Char('P') => {
                        for item in manager.send(ListDownloads).await? {
                            if item.status == TransferStatus::Active {
                                manager.do_send(PauseDownload { url: item.url });
                            }
                        }
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        for item in manager.send(ListDownloads).await? {
                            if item.status == TransferStatus::Suspended {
                                manager.do_send(ResumeDownload { url: item.url });
                            }
                        }
                    }
                    KeyCode::Char('c') | KeyCode::Char('C') => manager.do_send(CancelAll),
                    KeyCode::Char('x') | KeyCode::Char('X') => store.do_send(DeleteAll),
                    _ => {}
                },
                Event::FocusGained => {
                    manager.do_send(ReattachTransfers);
                    store.do_send(SetForeground(true));
                }
                Event::FocusLost => store.do_send(SetForeground(false)),
                _ => {}
            }
        }

        if last_sync.elapsed() >= SYNC_INTERVAL {
            let downloads = manager.send(ListDownloads).await?;
            if downloads.is_empty() {
                return Ok(());
            }
            view.sync(&downloads);
            last_sync = Instant::now();
        }

        tokio::time::sleep(KEYBOARD_POLL_INTERVAL).await;
    }
}
