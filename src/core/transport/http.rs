use actix::Recipient;
use awc::error::SendRequestError;
use awc::http::header::{self, HeaderMap, HeaderName};
use awc::http::StatusCode;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use url::Url;

use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::naming;
use super::buffer::BufferManager;
use super::session::{SessionEntry, SessionStore, Validators};
use super::{
    LiveTransfer, ResponseMetadata, ResumeToken, TransferHandle, TransferRequest, Transport,
    TransportEvent,
};

/// 写入缓冲区大小 (256 KB)
const WRITE_BUFFER_SIZE: usize = 256 * 1024;
const SESSION_FILE: &str = "session.json";

/// 传输任务的控制信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Suspend,
    Cancel,
}

/// 续传令牌里保存的内容
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct ResumeData {
    partial: PathBuf,
    #[serde(default)]
    validators: Validators,
}

impl ResumeData {
    fn encode(&self) -> Option<ResumeToken> {
        serde_json::to_vec(self).ok().map(ResumeToken::new)
    }

    fn decode(token: &ResumeToken) -> Option<Self> {
        serde_json::from_slice(token.as_bytes()).ok()
    }
}

struct Inner {
    client: awc::Client,
    temp_dir: PathBuf,
    max_redirects: u32,
    progress_interval: Duration,
    transfer_timeout: Duration,
    session: RefCell<SessionStore>,
    live: RefCell<HashMap<TransferHandle, watch::Sender<Control>>>,
}

impl Inner {
    fn record_validators(&self, handle: TransferHandle, validators: &Validators) {
        let mut session = self.session.borrow_mut();
        if let Some(mut entry) = session.get(handle).cloned() {
            if entry.validators != *validators {
                entry.validators = validators.clone();
                session.upsert(entry);
            }
        }
    }
}

/// 基于 awc 的 HTTP 传输
///
/// 所有传输运行在当前 Arbiter 上；临时数据和会话文件放在 `temp_dir`。
pub struct HttpTransport {
    inner: Rc<Inner>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> DownloadResult<Self> {
        let temp_dir = PathBuf::from(&config.temp_dir);
        fs::create_dir_all(&temp_dir).map_err(|e| DownloadError::disk("create", e))?;

        let client = awc::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .add_default_header((header::USER_AGENT, config.user_agent.clone()))
            .disable_redirects()
            .finish();

        let session = SessionStore::load(&temp_dir.join(SESSION_FILE));
        log::info!("HTTP传输已就绪，会话中有 {} 个未完成的传输", session.entries().len());

        Ok(Self {
            inner: Rc::new(Inner {
                client,
                temp_dir,
                max_redirects: config.max_redirects,
                progress_interval: Duration::from_millis(config.progress_interval_ms),
                transfer_timeout: Duration::from_secs(config.transfer_timeout),
                session: RefCell::new(session),
                live: RefCell::new(HashMap::new()),
            }),
        })
    }

    fn partial_path(&self, handle: TransferHandle) -> PathBuf {
        self.inner.temp_dir.join(format!("{}.part", handle))
    }

    fn launch(
        &self,
        handle: TransferHandle,
        url: Url,
        partial: PathBuf,
        validators: Validators,
        resumable: bool,
        events: Recipient<TransportEvent>,
    ) {
        let (control, receiver) = watch::channel(Control::Run);
        self.inner.live.borrow_mut().insert(handle, control);
        self.inner.session.borrow_mut().upsert(SessionEntry {
            handle,
            url: url.to_string(),
            partial: partial.clone(),
            validators: validators.clone(),
        });
        log::info!("开始传输 {}: {}", handle, url);

        let job = TransferJob {
            handle,
            url,
            partial,
            validators,
            resumable,
            inner: Rc::clone(&self.inner),
            events,
        };
        actix::spawn(job.run(receiver));
    }
}

impl Transport for HttpTransport {
    fn start(&self, request: TransferRequest, events: Recipient<TransportEvent>) -> TransferHandle {
        let handle = TransferHandle::new();
        let (url, partial, validators, resumable) = match request {
            TransferRequest::Resume { url, token } => {
                match ResumeData::decode(&token).filter(|data| data.partial.exists()) {
                    Some(data) => (url, data.partial, data.validators, true),
                    None => {
                        log::warn!("续传令牌无效，重新开始下载: {}", url);
                        (url, self.partial_path(handle), Validators::default(), false)
                    }
                }
            }
            TransferRequest::Fresh(url) => (url, self.partial_path(handle), Validators::default(), false),
        };
        self.launch(handle, url, partial, validators, resumable, events);
        handle
    }

    fn suspend(&self, handle: TransferHandle) {
        match self.inner.live.borrow().get(&handle) {
            Some(control) => {
                control.send_if_modified(|state| {
                    if *state == Control::Run {
                        *state = Control::Suspend;
                        true
                    } else {
                        false
                    }
                });
            }
            None => log::debug!("暂停的传输已经结束: {}", handle),
        }
    }

    fn cancel(&self, handle: TransferHandle) {
        if let Some(control) = self.inner.live.borrow().get(&handle) {
            control.send_replace(Control::Cancel);
            return;
        }
        // 上次运行遗留、尚未恢复的传输
        let entry = self.inner.session.borrow_mut().remove(handle);
        if let Some(entry) = entry {
            remove_partial(&entry.partial);
        }
    }

    fn discard(&self, token: &ResumeToken) {
        if let Some(data) = ResumeData::decode(token) {
            remove_partial(&data.partial);
        }
    }

    fn live_transfers(&self) -> Vec<LiveTransfer> {
        self.inner.session.borrow().live_transfers()
    }

    fn resume_live(&self, handle: TransferHandle, events: Recipient<TransportEvent>) -> bool {
        if self.inner.live.borrow().contains_key(&handle) {
            return true;
        }
        let entry = self.inner.session.borrow().get(handle).cloned();
        let Some(entry) = entry else {
            return false;
        };
        match Url::parse(&entry.url) {
            Ok(url) => {
                self.launch(handle, url, entry.partial, entry.validators, true, events);
                true
            }
            Err(_) => false,
        }
    }
}

enum Outcome {
    Finished(ResponseMetadata),
    Failed(DownloadError),
    Stopped(Control),
}

/// 单次传输，运行在 actix::spawn 出来的任务里
struct TransferJob {
    handle: TransferHandle,
    url: Url,
    partial: PathBuf,
    validators: Validators,
    resumable: bool,
    inner: Rc<Inner>,
    events: Recipient<TransportEvent>,
}

impl TransferJob {
    async fn run(mut self, mut control: watch::Receiver<Control>) {
        let outcome = tokio::select! {
            biased;
            stop = wait_for_stop(&mut control) => Outcome::Stopped(stop),
            result = self.fetch() => match result {
                Ok(response) => Outcome::Finished(response),
                Err(error) => Outcome::Failed(error),
            },
        };
        self.finish(outcome);
    }

    async fn fetch(&mut self) -> DownloadResult<ResponseMetadata> {
        let offset = fs::metadata(&self.partial).map(|m| m.len()).unwrap_or(0);

        let mut current = self.url.clone();
        let mut redirects = 0;
        let response = loop {
            let mut request = self.inner.client.get(current.as_str());
            if offset > 0 {
                request = request.insert_header((header::RANGE, format!("bytes={}-", offset)));
                let validator = self.validators.etag.as_ref().or(self.validators.last_modified.as_ref());
                if let Some(validator) = validator {
                    request = request.insert_header((header::IF_RANGE, validator.clone()));
                }
            }

            let response = request.send().await.map_err(|e| self.send_error(e))?;
            if response.status().is_redirection() {
                if let Some(location) = response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()) {
                    if redirects >= self.inner.max_redirects {
                        return Err(DownloadError::transfer_failed("Too Many Redirects"));
                    }
                    current = current
                        .join(location)
                        .map_err(|_| DownloadError::transfer_failed(format!("Invalid Redirect: {}", location)))?;
                    redirects += 1;
                    log::info!("重定向 {}: {}", self.handle, current);
                    self.events.do_send(TransportEvent::Redirected {
                        handle: self.handle,
                        location: current.to_string(),
                    });
                    continue;
                }
            }
            break response;
        };

        let status = response.status();
        let append = match status {
            StatusCode::PARTIAL_CONTENT if offset > 0 => true,
            s if s.is_success() => false,
            s => return Err(DownloadError::transfer_failed(format!("HTTP {}", s))),
        };

        let headers = response.headers();
        let received_before = if append { offset } else { 0 };
        let length = header_value(headers, header::CONTENT_LENGTH).and_then(|v| v.parse::<u64>().ok());
        let total = header_value(headers, header::CONTENT_RANGE)
            .and_then(|v| parse_content_range_total(&v))
            .or(length.map(|len| len + received_before))
            .unwrap_or(0);
        self.resumable = append
            || header_value(headers, header::ACCEPT_RANGES)
                .map(|v| v.eq_ignore_ascii_case("bytes"))
                .unwrap_or(false);
        self.validators = Validators {
            etag: header_value(headers, header::ETAG),
            last_modified: header_value(headers, header::LAST_MODIFIED),
        };
        self.inner.record_validators(self.handle, &self.validators);

        let mut metadata = ResponseMetadata::new(self.url.clone());
        metadata.suggested_filename = header_value(headers, header::CONTENT_DISPOSITION)
            .and_then(|v| naming::filename_from_content_disposition(&v));
        metadata.mime_type = header_value(headers, header::CONTENT_TYPE);
        metadata.response_url = Some(current);

        let mut response = response.timeout(self.inner.transfer_timeout);
        let mut writer = BufferManager::open(&self.partial, WRITE_BUFFER_SIZE, append)?;
        let mut received = received_before;
        let mut last_update = Instant::now();
        if append {
            self.report_progress(received, total);
        }

        while let Some(chunk) = response.next().await {
            let bytes = chunk.map_err(|e| DownloadError::transfer_failed(format!("网络流错误: {}", e)))?;
            writer.write(&bytes)?;
            received += bytes.len() as u64;
            if last_update.elapsed() >= self.inner.progress_interval {
                self.report_progress(received, total);
                last_update = Instant::now();
            }
        }
        writer.flush()?;
        log::debug!("{} 本次写入 {} 字节，共 {} 字节", self.handle, writer.total_written(), received);

        if total > 0 && received < total {
            return Err(DownloadError::transfer_failed(format!(
                "Incomplete Response ({} / {} bytes)",
                received, total
            )));
        }
        self.report_progress(received, total.max(received));
        Ok(metadata)
    }

    fn send_error(&self, error: SendRequestError) -> DownloadError {
        match error {
            SendRequestError::Connect(e) => {
                self.events.do_send(TransportEvent::WaitingForConnectivity { handle: self.handle });
                DownloadError::transfer_failed(format!("No Connection ({})", e))
            }
            SendRequestError::Timeout => DownloadError::transfer_failed("Timed Out"),
            other => DownloadError::transfer_failed(other.to_string()),
        }
    }

    fn report_progress(&self, received: u64, total: u64) {
        let fraction = if total > 0 {
            (received as f64 / total as f64).min(1.0)
        } else {
            0.0
        };
        self.events.do_send(TransportEvent::Progress {
            handle: self.handle,
            fraction,
        });
    }

    fn resume_token(&self) -> Option<ResumeToken> {
        let written = fs::metadata(&self.partial).map(|m| m.len()).unwrap_or(0);
        if !self.resumable || written == 0 {
            return None;
        }
        ResumeData {
            partial: self.partial.clone(),
            validators: self.validators.clone(),
        }
        .encode()
    }

    fn finish(self, outcome: Outcome) {
        let handle = self.handle;
        self.inner.live.borrow_mut().remove(&handle);
        self.inner.session.borrow_mut().remove(handle);

        match outcome {
            Outcome::Finished(response) => {
                log::info!("传输完成 {}: {}", handle, self.url);
                self.events.do_send(TransportEvent::Finished {
                    handle,
                    payload: self.partial.clone(),
                    response,
                });
                self.events.do_send(TransportEvent::Completed { handle, error: None });
            }
            Outcome::Failed(error) => {
                log::warn!("传输失败 {}: {} ({})", handle, self.url, error);
                remove_partial(&self.partial);
                self.events.do_send(TransportEvent::Completed { handle, error: Some(error) });
            }
            Outcome::Stopped(Control::Suspend) => {
                let token = self.resume_token();
                if token.is_none() {
                    remove_partial(&self.partial);
                }
                log::info!("传输已暂停 {}: 续传令牌{}", handle, if token.is_some() { "已生成" } else { "不可用" });
                self.events.do_send(TransportEvent::ResumeData { handle, token });
                self.events.do_send(TransportEvent::Completed {
                    handle,
                    error: Some(DownloadError::Cancelled),
                });
            }
            Outcome::Stopped(_) => {
                log::info!("传输已取消 {}", handle);
                remove_partial(&self.partial);
                self.events.do_send(TransportEvent::Completed {
                    handle,
                    error: Some(DownloadError::Cancelled),
                });
            }
        }
    }
}

async fn wait_for_stop(control: &mut watch::Receiver<Control>) -> Control {
    match control.wait_for(|state| *state != Control::Run).await {
        Ok(state) => *state,
        Err(_) => Control::Cancel,
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// 解析 `Content-Range: bytes 100-199/200` 中的总长度
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("无法删除临时文件 {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::prelude::*;
    use std::io::{self, BufRead, BufReader, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread;

    const ETAG: &str = "\"v1\"";

    fn config_in(dir: &Path) -> Config {
        Config {
            temp_dir: dir.join("transfers").to_string_lossy().to_string(),
            progress_interval_ms: 10,
            ..Config::default()
        }
    }

    #[derive(Debug, Clone)]
    struct SeenRequest {
        path: String,
        range: Option<String>,
        if_range: Option<String>,
    }

    /// 本地 HTTP 服务，每个连接一个线程
    ///
    /// `/file` 整个返回 body 并支持 Range，`/slow` 相同但分块慢慢发送，
    /// `/redirect` 跳到 `/file`，`/missing` 返回 404，`/short` 的长度少于 Content-Range 声明的总长度。
    struct TestServer {
        addr: SocketAddr,
        requests: Arc<Mutex<Vec<SeenRequest>>>,
    }

    impl TestServer {
        fn start(body: Vec<u8>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let body = Arc::new(body);
            let seen = Arc::clone(&requests);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    let (body, seen) = (Arc::clone(&body), Arc::clone(&seen));
                    thread::spawn(move || {
                        let _ = serve(stream, &body, &seen);
                    });
                }
            });
            Self { addr, requests }
        }

        fn url(&self, path: &str) -> Url {
            Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
        }

        fn requests(&self, path: &str) -> Vec<SeenRequest> {
            self.requests.lock().unwrap().iter().filter(|r| r.path == path).cloned().collect()
        }
    }

    fn serve(mut stream: TcpStream, body: &[u8], requests: &Mutex<Vec<SeenRequest>>) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let mut seen = SeenRequest {
            path: line.split_whitespace().nth(1).unwrap_or("/").to_string(),
            range: None,
            if_range: None,
        };
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                match name.trim().to_ascii_lowercase().as_str() {
                    "range" => seen.range = Some(value.trim().to_string()),
                    "if-range" => seen.if_range = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }
        requests.lock().unwrap().push(seen.clone());

        match seen.path.as_str() {
            "/redirect" => write!(
                stream,
                "HTTP/1.1 302 Found\r\nLocation: /file\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            ),
            "/missing" => write!(
                stream,
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            ),
            "/short" => {
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: 10\r\nContent-Range: bytes 0-9/100\r\nConnection: close\r\n\r\n"
                )?;
                stream.write_all(&body[..10])
            }
            path => serve_body(&mut stream, body, &seen, path == "/slow"),
        }
    }

    fn serve_body(stream: &mut TcpStream, body: &[u8], seen: &SeenRequest, slow: bool) -> io::Result<()> {
        let offset = seen
            .range
            .as_deref()
            .filter(|_| seen.if_range.as_deref().map_or(true, |v| v == ETAG))
            .and_then(|r| r.strip_prefix("bytes=")?.strip_suffix('-')?.parse::<usize>().ok())
            .filter(|start| *start < body.len())
            .unwrap_or(0);
        let status = if offset > 0 { "206 Partial Content" } else { "200 OK" };
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nETag: {}\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=\"greeting.txt\"\r\nConnection: close\r\n",
            status,
            body.len() - offset,
            ETAG
        )?;
        if offset > 0 {
            write!(stream, "Content-Range: bytes {}-{}/{}\r\n", offset, body.len() - 1, body.len())?;
        }
        write!(stream, "\r\n")?;
        for chunk in body[offset..].chunks(64 * 1024) {
            stream.write_all(chunk)?;
            if slow {
                thread::sleep(Duration::from_millis(20));
            }
        }
        stream.flush()
    }

    /// 收集传输事件的 Actor
    #[derive(Clone, Default)]
    struct EventLog(Rc<RefCell<Vec<TransportEvent>>>);

    impl Actor for EventLog {
        type Context = Context<Self>;
    }

    impl Handler<TransportEvent> for EventLog {
        type Result = ();

        fn handle(&mut self, msg: TransportEvent, _ctx: &mut Self::Context) {
            self.0.borrow_mut().push(msg);
        }
    }

    impl EventLog {
        fn recipient(&self) -> Recipient<TransportEvent> {
            self.clone().start().recipient()
        }

        async fn wait_for<F>(&self, done: F)
        where
            F: Fn(&[TransportEvent]) -> bool,
        {
            for _ in 0..500 {
                if done(&self.0.borrow()) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("transport events never arrived: {:?}", self.0.borrow());
        }

        async fn wait_completed(&self, handle: TransferHandle) {
            self.wait_for(|events| {
                events
                    .iter()
                    .any(|e| matches!(e, TransportEvent::Completed { handle: h, .. } if *h == handle))
            })
            .await;
        }

        fn completion_error(&self, handle: TransferHandle) -> Option<String> {
            self.0.borrow().iter().find_map(|e| match e {
                TransportEvent::Completed { handle: h, error } if *h == handle => {
                    Some(error.as_ref().map(|e| e.to_string()).unwrap_or_default())
                }
                _ => None,
            })
        }

        fn finished(&self, handle: TransferHandle) -> Option<(PathBuf, ResponseMetadata)> {
            self.0.borrow().iter().find_map(|e| match e {
                TransportEvent::Finished { handle: h, payload, response } if *h == handle => {
                    Some((payload.clone(), response.clone()))
                }
                _ => None,
            })
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[actix_rt::test]
    async fn test_redirect_is_followed_and_reported() {
        let server = TestServer::start(b"hello world".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new(&config_in(dir.path())).unwrap();
        let log = EventLog::default();

        let handle = transport.start(TransferRequest::Fresh(server.url("/redirect")), log.recipient());
        log.wait_completed(handle).await;

        assert_eq!(log.completion_error(handle), Some(String::new()));
        assert!(log.0.borrow().iter().any(|e| matches!(
            e,
            TransportEvent::Redirected { handle: h, location } if *h == handle && *location == server.url("/file").to_string()
        )));
        let (payload, response) = log.finished(handle).unwrap();
        assert_eq!(fs::read(&payload).unwrap(), b"hello world");
        assert_eq!(response.request_url, server.url("/redirect"));
        assert_eq!(response.response_url, Some(server.url("/file")));
        assert_eq!(response.suggested_filename.as_deref(), Some("greeting.txt"));
        assert_eq!(response.mime_type.as_deref(), Some("text/plain"));
        assert!(transport.live_transfers().is_empty());
    }

    #[actix_rt::test]
    async fn test_http_error_status_fails_transfer() {
        let server = TestServer::start(Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new(&config_in(dir.path())).unwrap();
        let log = EventLog::default();

        let handle = transport.start(TransferRequest::Fresh(server.url("/missing")), log.recipient());
        log.wait_completed(handle).await;

        assert_eq!(log.completion_error(handle), Some("下载失败: HTTP 404 Not Found".to_string()));
        assert!(log.finished(handle).is_none());
        assert!(!transport.partial_path(handle).exists());
    }

    #[actix_rt::test]
    async fn test_incomplete_response_fails_transfer() {
        let server = TestServer::start(pattern(100));
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new(&config_in(dir.path())).unwrap();
        let log = EventLog::default();

        let handle = transport.start(TransferRequest::Fresh(server.url("/short")), log.recipient());
        log.wait_completed(handle).await;

        let error = log.completion_error(handle).unwrap();
        assert!(error.contains("Incomplete Response (10 / 100 bytes)"), "{}", error);
        assert!(!transport.partial_path(handle).exists());
    }

    #[actix_rt::test]
    async fn test_suspend_then_resume_with_range() {
        let body = pattern(2 * 1024 * 1024);
        let server = TestServer::start(body.clone());
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new(&config_in(dir.path())).unwrap();
        let log = EventLog::default();
        let url = server.url("/slow");

        let first = transport.start(TransferRequest::Fresh(url.clone()), log.recipient());
        log.wait_for(|events| {
            events
                .iter()
                .any(|e| matches!(e, TransportEvent::Progress { handle, fraction } if *handle == first && *fraction > 0.0))
        })
        .await;
        transport.suspend(first);
        log.wait_completed(first).await;

        let token = log
            .0
            .borrow()
            .iter()
            .find_map(|e| match e {
                TransportEvent::ResumeData { handle, token } if *handle == first => Some(token.clone()),
                _ => None,
            })
            .unwrap()
            .expect("suspended transfer should produce a resume token");
        assert_eq!(log.completion_error(first), Some(DownloadError::Cancelled.to_string()));
        assert!(log.finished(first).is_none());

        let second = transport.start(TransferRequest::Resume { url, token }, log.recipient());
        log.wait_completed(second).await;

        assert_eq!(log.completion_error(second), Some(String::new()));
        let (payload, _) = log.finished(second).unwrap();
        assert_eq!(fs::read(&payload).unwrap(), body);

        let requests = server.requests("/slow");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].range, None);
        let range = requests[1].range.as_deref().unwrap();
        let offset: usize = range.strip_prefix("bytes=").unwrap().strip_suffix('-').unwrap().parse().unwrap();
        assert!(offset > 0 && offset < body.len(), "{}", range);
        assert_eq!(requests[1].if_range.as_deref(), Some(ETAG));
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 100-199/200"), Some(200));
        assert_eq!(parse_content_range_total("bytes 0-0/1"), Some(1));
        assert_eq!(parse_content_range_total("bytes 0-99/*"), None);
    }

    #[test]
    fn test_resume_data_token() {
        let data = ResumeData {
            partial: PathBuf::from("/tmp/a.part"),
            validators: Validators {
                etag: Some("\"abc\"".to_string()),
                last_modified: None,
            },
        };
        let token = data.encode().unwrap();
        assert_eq!(ResumeData::decode(&token), Some(data));
        assert_eq!(ResumeData::decode(&ResumeToken::new(&b"garbage"[..])), None);
    }

    #[actix_rt::test]
    async fn test_live_transfers_from_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let temp_dir = PathBuf::from(&config.temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();

        let handle = TransferHandle::new();
        let partial = temp_dir.join("left.part");
        fs::write(&partial, b"1234").unwrap();
        {
            let mut session = SessionStore::load(&temp_dir.join(SESSION_FILE));
            session.upsert(SessionEntry {
                handle,
                url: "http://example.com/big.iso".to_string(),
                partial: partial.clone(),
                validators: Validators::default(),
            });
        }

        let transport = HttpTransport::new(&config).unwrap();
        let live = transport.live_transfers();
        assert_eq!(live, vec![LiveTransfer {
            handle,
            url: Url::parse("http://example.com/big.iso").unwrap(),
        }]);

        // 取消尚未恢复的传输会清掉会话记录和临时文件
        transport.cancel(handle);
        assert!(transport.live_transfers().is_empty());
        assert!(!partial.exists());
    }

    #[actix_rt::test]
    async fn test_discard_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new(&config_in(dir.path())).unwrap();

        let partial = dir.path().join("old.part");
        fs::write(&partial, b"data").unwrap();
        let token = ResumeData {
            partial: partial.clone(),
            validators: Validators::default(),
        }
        .encode()
        .unwrap();

        transport.discard(&token);
        assert!(!partial.exists());
    }
}
