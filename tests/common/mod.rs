//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use fetch_gateway::admission::ConcurrencyLimiter;
use fetch_gateway::fetch::{AcquireFuture, AcquisitionStrategy, FetchOrchestrator};
use fetch_gateway::observability::MetricsRecorder;
use fetch_gateway::resilience::{CircuitBreaker, RetryPolicy};
use fetch_gateway::{FetchError, Gateway, Shutdown, StrategyKind};

/// What a mock origin saw.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(head_end + content_length);
    let body = String::from_utf8_lossy(&buf[head_end..body_end]).to_string();

    Some(MockRequest { method, path, body })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock origin on an ephemeral port and return its address.
///
/// The handler sees each request and decides status and body; it may sleep to
/// simulate a slow origin.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock origin that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, body.to_string()) }).await
}

/// One scripted strategy outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Content(String),
    Fail(FetchError),
    /// Sleep, then return content.
    Slow(Duration, String),
    /// Never complete; only a timeout or cancellation ends the attempt.
    Hang,
}

pub fn content(body: &str) -> Step {
    Step::Content(body.to_string())
}

pub fn network(message: &str) -> Step {
    Step::Fail(FetchError::Network(message.to_string()))
}

/// Order in which strategies were invoked, across strategies.
pub type CallLog = Arc<Mutex<Vec<StrategyKind>>>;

type Behavior = Box<dyn Fn(&Url, u32) -> Step + Send + Sync>;

/// In-memory strategy driven by a script, counting calls and overlap.
pub struct ScriptedStrategy {
    kind: StrategyKind,
    timeout: Duration,
    behavior: Behavior,
    calls: AtomicU32,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    log: Option<CallLog>,
}

impl ScriptedStrategy {
    /// `behavior` receives the URL and the 1-based call number.
    pub fn new(
        kind: StrategyKind,
        behavior: impl Fn(&Url, u32) -> Step + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            timeout: Duration::from_secs(10),
            behavior: Box::new(behavior),
            calls: AtomicU32::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            log: None,
        }
    }

    pub fn always(kind: StrategyKind, step: Step) -> Self {
        Self::new(kind, move |_, _| step.clone())
    }

    /// Play `steps` in order, then repeat `then` forever.
    pub fn sequence(kind: StrategyKind, steps: Vec<Step>, then: Step) -> Self {
        Self::new(kind, move |_, call| {
            steps
                .get(call as usize - 1)
                .cloned()
                .unwrap_or_else(|| then.clone())
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AcquisitionStrategy for ScriptedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn attempt<'a>(&'a self, url: &'a Url, _timeout: Duration) -> AcquireFuture<'a> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.kind);
        }
        let step = (self.behavior)(url, call);

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let guard = ActiveGuard(self.active.clone());

        Box::pin(async move {
            let _guard = guard;
            match step {
                Step::Content(body) => Ok(body),
                Step::Fail(error) => Err(error),
                Step::Slow(delay, body) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

/// Orchestrator over scripted tiers, both using `policy`.
pub fn orchestrator(
    breaker: Arc<CircuitBreaker>,
    tiers: Vec<Arc<ScriptedStrategy>>,
    policy: RetryPolicy,
) -> FetchOrchestrator {
    tiers.into_iter().fold(
        FetchOrchestrator::new(breaker, Arc::new(MetricsRecorder::new())),
        |orchestrator, strategy| orchestrator.tier(strategy, policy),
    )
}

/// Gateway over scripted tiers with no retries and a huge breaker threshold.
pub fn gateway(
    tiers: Vec<Arc<ScriptedStrategy>>,
    limit: usize,
    threshold: u32,
    shutdown: Shutdown,
) -> Gateway {
    let breaker = Arc::new(CircuitBreaker::new(threshold));
    Gateway::new(
        orchestrator(breaker, tiers, RetryPolicy::no_retry()),
        ConcurrencyLimiter::new(limit),
        shutdown,
        Duration::from_secs(60),
    )
}

/// The standard two-step backoff policy: 3 attempts, 500ms base, no jitter.
pub fn standard_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(500))
}
