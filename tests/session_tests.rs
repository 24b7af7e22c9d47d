// End-to-end pump-loop tests: scripted capture backend, mock token
// endpoint, loopback STT server. Asserts the wire-level ordering
// contracts: config first, every chunk exactly once, EOS last, and the
// no-drop/no-reorder property across a mid-session re-handshake.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use futures::StreamExt;
use sysaudio_stt::{
    AudioBackend, AudioFrame, SampleFormat, SessionConfig, SessionCoordinator, TokenManager,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Per-connection message logs, in accept order
type ServerLog = Arc<Mutex<Vec<Vec<Message>>>>;

/// Queue of `expire_at` values the token endpoint hands out, in order.
/// Once empty it falls back to a far-future expiry.
type ExpiryScript = Arc<Mutex<VecDeque<i64>>>;

fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

async fn spawn_token_server(script: ExpiryScript) -> SocketAddr {
    async fn handler(State(script): State<ExpiryScript>) -> Json<serde_json::Value> {
        let expire_at = script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| epoch_now() + 3600);
        Json(serde_json::json!({
            "access_token": format!("token-{}", expire_at),
            "expire_at": expire_at,
        }))
    }

    let app = Router::new()
        .route("/authenticate", post(handler))
        .with_state(script);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Loopback STT server accepting any number of sequential connections
async fn spawn_stream_server() -> (SocketAddr, ServerLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: ServerLog = Arc::new(Mutex::new(Vec::new()));

    let accept_log = Arc::clone(&log);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let connection_log = Arc::clone(&accept_log);
            let index = {
                let mut log = connection_log.lock().unwrap();
                log.push(Vec::new());
                log.len() - 1
            };
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Close(_) => break,
                        Message::Ping(_) | Message::Pong(_) => {}
                        other => connection_log.lock().unwrap()[index].push(other),
                    }
                }
            });
        }
    });

    (addr, log)
}

/// Capture backend that plays a fixed list of frames, then ends the source
struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    capturing: bool,
}

impl ScriptedBackend {
    fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            capturing: false,
        }
    }
}

#[async_trait]
impl AudioBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let frames = std::mem::take(&mut self.frames);
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Capture backend that plays two bursts of frames separated by a pause,
/// so a token expiry can land between them
struct TwoBurstBackend {
    first: Vec<AudioFrame>,
    second: Vec<AudioFrame>,
    pause: Duration,
    capturing: bool,
}

#[async_trait]
impl AudioBackend for TwoBurstBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let first = std::mem::take(&mut self.first);
        let second = std::mem::take(&mut self.second);
        let pause = self.pause;
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for frame in first {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            tokio::time::sleep(pause).await;
            for frame in second {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
        });
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "two-burst"
    }
}

/// Capture backend that never ends on its own; frames keep flowing until
/// the consumer goes away
struct EndlessBackend;

#[async_trait]
impl AudioBackend for EndlessBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if tx.send(i16_frame(&[0, 0])).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "endless"
    }
}

fn i16_frame(samples: &[i16]) -> AudioFrame {
    AudioFrame {
        bytes: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        sample_rate: 16000,
        channels: 1,
        format: Some(SampleFormat::I16),
        interleaved: true,
    }
}

fn binaries(messages: &[Message]) -> Vec<Vec<u8>> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::Binary(bytes) => Some(bytes.clone()),
            _ => None,
        })
        .collect()
}

fn is_config(message: &Message) -> bool {
    matches!(message, Message::Text(text) if text.contains("LINEAR16"))
}

fn is_eos(message: &Message) -> bool {
    matches!(message, Message::Text(text) if text == "EOS")
}

async fn run_coordinator(
    token_addr: SocketAddr,
    stream_addr: SocketAddr,
    backend: Box<dyn AudioBackend>,
    shutdown: CancellationToken,
) -> Result<()> {
    let tokens = TokenManager::new(
        format!("http://{}/authenticate", token_addr),
        "id".to_string(),
        "secret".to_string(),
    );
    let coordinator = SessionCoordinator::new(
        format!("ws://{}", stream_addr),
        SessionConfig::default(),
        tokens,
        backend,
    );
    coordinator.run(shutdown).await
}

#[tokio::test]
async fn full_session_sends_config_chunks_and_eos_in_order() {
    let token_addr = spawn_token_server(Arc::new(Mutex::new(VecDeque::new()))).await;
    let (stream_addr, log) = spawn_stream_server().await;

    let frames = vec![
        i16_frame(&[1, 1]),
        i16_frame(&[2, 2]),
        i16_frame(&[3, 3]),
    ];
    let backend = Box::new(ScriptedBackend::new(frames));

    run_coordinator(token_addr, stream_addr, backend, CancellationToken::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1, "a valid token needs exactly one stream");

    let messages = &log[0];
    assert_eq!(messages.len(), 5);
    assert!(is_config(&messages[0]), "config must be the first message");
    assert_eq!(
        binaries(messages),
        vec![
            i16_frame(&[1, 1]).bytes,
            i16_frame(&[2, 2]).bytes,
            i16_frame(&[3, 3]).bytes,
        ]
    );
    assert!(is_eos(&messages[4]), "EOS must be the last message");
}

#[tokio::test]
async fn expired_token_triggers_rehandshake_without_losing_chunks() {
    // First token is already expired; the refresh returns a valid one.
    let script: ExpiryScript = Arc::new(Mutex::new(VecDeque::from([0, epoch_now() + 3600])));
    let token_addr = spawn_token_server(script).await;
    let (stream_addr, log) = spawn_stream_server().await;

    let frames = vec![
        i16_frame(&[10, 10]),
        i16_frame(&[20, 20]),
        i16_frame(&[30, 30]),
    ];
    let backend = Box::new(ScriptedBackend::new(frames));

    run_coordinator(token_addr, stream_addr, backend, CancellationToken::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2, "expiry must close stream A and open stream B");

    // Stream A: opened with the stale token, closed before any audio.
    let stream_a = &log[0];
    assert!(is_config(&stream_a[0]));
    assert!(binaries(stream_a).is_empty(), "no audio may ride the stale stream");
    assert!(is_eos(stream_a.last().unwrap()));

    // Stream B: fresh config, then every chunk exactly once, in order.
    let stream_b = &log[1];
    assert!(is_config(&stream_b[0]), "re-handshake must re-send the config");
    assert_eq!(
        binaries(stream_b),
        vec![
            i16_frame(&[10, 10]).bytes,
            i16_frame(&[20, 20]).bytes,
            i16_frame(&[30, 30]).bytes,
        ]
    );
    assert!(is_eos(stream_b.last().unwrap()));
}

#[tokio::test]
async fn mid_stream_expiry_splits_chunks_across_streams_without_loss() {
    // The first token stays valid for at least one more wall-clock second,
    // so the opening burst rides stream A; by the time the second burst
    // arrives it has expired and every later chunk must ride stream B,
    // with nothing re-sent.
    let script: ExpiryScript = Arc::new(Mutex::new(VecDeque::from([
        epoch_now() + 2,
        epoch_now() + 3600,
    ])));
    let token_addr = spawn_token_server(script).await;
    let (stream_addr, log) = spawn_stream_server().await;

    let backend = Box::new(TwoBurstBackend {
        first: vec![i16_frame(&[1, 1]), i16_frame(&[2, 2])],
        second: vec![i16_frame(&[3, 3]), i16_frame(&[4, 4]), i16_frame(&[5, 5])],
        pause: Duration::from_millis(2500),
        capturing: false,
    });

    run_coordinator(token_addr, stream_addr, backend, CancellationToken::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2, "mid-stream expiry must open a second stream");

    // Stream A: the chunks sent while the token was still valid, nothing
    // from after the expiry.
    let stream_a = &log[0];
    assert!(is_config(&stream_a[0]));
    assert_eq!(
        binaries(stream_a),
        vec![i16_frame(&[1, 1]).bytes, i16_frame(&[2, 2]).bytes]
    );
    assert!(is_eos(stream_a.last().unwrap()));

    // Stream B: fresh config, then only the post-expiry chunks, in order.
    let stream_b = &log[1];
    assert!(is_config(&stream_b[0]), "re-handshake must re-send the config");
    assert_eq!(
        binaries(stream_b),
        vec![
            i16_frame(&[3, 3]).bytes,
            i16_frame(&[4, 4]).bytes,
            i16_frame(&[5, 5]).bytes,
        ],
        "earlier chunks must not be duplicated onto the new stream"
    );
    assert!(is_eos(stream_b.last().unwrap()));
}

#[tokio::test]
async fn bad_frames_are_skipped_not_fatal() {
    let token_addr = spawn_token_server(Arc::new(Mutex::new(VecDeque::new()))).await;
    let (stream_addr, log) = spawn_stream_server().await;

    let no_format = AudioFrame {
        bytes: vec![0; 8],
        sample_rate: 16000,
        channels: 1,
        format: None,
        interleaved: true,
    };
    let frames = vec![i16_frame(&[1, 1]), no_format, i16_frame(&[2, 2])];
    let backend = Box::new(ScriptedBackend::new(frames));

    run_coordinator(token_addr, stream_addr, backend, CancellationToken::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(
        binaries(&log[0]),
        vec![i16_frame(&[1, 1]).bytes, i16_frame(&[2, 2]).bytes],
        "the unconvertible frame is skipped, its neighbors still flow"
    );
}

#[tokio::test]
async fn cancellation_stops_the_pump_and_closes_the_stream() {
    let token_addr = spawn_token_server(Arc::new(Mutex::new(VecDeque::new()))).await;
    let (stream_addr, log) = spawn_stream_server().await;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = run_coordinator(token_addr, stream_addr, Box::new(EndlessBackend), shutdown).await;
    assert!(result.is_ok(), "cancellation is a clean stop: {:?}", result);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    let messages = &log[0];
    assert!(is_config(&messages[0]));
    assert!(
        is_eos(messages.last().unwrap()),
        "teardown must close the stream with EOS before exit"
    );
}
