//! Duplex transcription stream over WebSocket
//!
//! Lifecycle: connect with a bearer token, send the `DecoderConfig` as the
//! first message, then stream binary audio frames while a background task
//! reads result events. `close` sends the end-of-input marker and is
//! idempotent. A handle only exists while the session is open; re-opening
//! after a token refresh means closing this handle and building a new one.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::audio::PcmChunk;
use crate::auth::Token;
use crate::error::StreamError;

use super::protocol::{DecoderConfig, SpeechResult, StreamingResponse, END_OF_STREAM};

/// Timeout for the WebSocket connect + upgrade
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `close` waits for the read side to drain the results the
/// server emits in response to end-of-input
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

type WsSink = futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Handle to an open transcription session
///
/// Owns the write half; the read half lives in a spawned task that decodes
/// server responses and forwards each result, in arrival order, into the
/// sender supplied to `open`. The results channel closes when the stream
/// ends, so a pending receive terminates rather than hangs.
pub struct TranscriptionStream {
    write: Option<WsSink>,
    receiver_task: tokio::task::JoinHandle<()>,
}

impl TranscriptionStream {
    /// Open the duplex connection and perform the config handshake
    ///
    /// The stream counts as open once the transport accepts the config
    /// message locally; server-side rejection surfaces later as a stream
    /// error on the read side.
    pub async fn open(
        url: &str,
        config: &DecoderConfig,
        token: &Token,
        results_tx: mpsc::Sender<SpeechResult>,
    ) -> Result<Self, StreamError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", token.access_token))
                .map_err(|e| StreamError::Connect(e.to_string()))?,
        );

        info!("Opening transcription stream: {}", url);

        let (ws_stream, _response) = timeout(
            CONNECT_TIMEOUT,
            connect_async_with_config(request, None, true),
        )
        .await
        .map_err(|_| StreamError::Connect("connection timeout".to_string()))?
        .map_err(|e| StreamError::Connect(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        // Config handshake: always the first client message.
        let config_json =
            serde_json::to_string(config).map_err(|e| StreamError::Protocol(e.to_string()))?;
        write
            .send(Message::Text(config_json))
            .await
            .map_err(|e| StreamError::Handshake(e.to_string()))?;

        let receiver_task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<StreamingResponse>(&text) {
                            Ok(response) => {
                                for result in response.results {
                                    if results_tx.send(result).await.is_err() {
                                        debug!("Results consumer gone, stopping read side");
                                        return;
                                    }
                                }
                            }
                            Err(e) => warn!("Failed to parse server response: {}", e),
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!("Stream closed by server: {:?}", frame);
                        break;
                    }
                    Ok(_) => {} // ping/pong/binary
                    Err(e) => {
                        warn!("Stream read error: {}", e);
                        break;
                    }
                }
            }
            // results_tx drops here, closing the lazy result sequence
        });

        Ok(Self {
            write: Some(write),
            receiver_task,
        })
    }

    /// Send one PCM chunk as a binary frame
    ///
    /// The send is awaited on the caller's flow, so a failure is observed
    /// before the next chunk rather than one iteration late.
    pub async fn send(&mut self, chunk: PcmChunk) -> Result<(), StreamError> {
        let write = self.write.as_mut().ok_or(StreamError::Closed)?;

        write.send(Message::Binary(chunk.bytes)).await?;
        Ok(())
    }

    /// Whether the send side is still open
    pub fn is_open(&self) -> bool {
        self.write.is_some()
    }

    /// Send the end-of-input marker and release the connection
    ///
    /// Idempotent: the write half is taken on the first call, so a second
    /// call is a no-op. Best-effort; failures are logged, not returned,
    /// since close runs on teardown paths that must not short-circuit.
    ///
    /// The server answers end-of-input with the final results for the
    /// last utterance, so the read side is drained (bounded) before it is
    /// stopped; aborting it immediately would lose the last caption.
    pub async fn close(&mut self) {
        let Some(mut write) = self.write.take() else {
            return;
        };

        if let Err(e) = write.send(Message::Text(END_OF_STREAM.to_string())).await {
            warn!("Failed to send end-of-input marker: {}", e);
        }

        if let Err(e) = write.close().await {
            warn!("Failed to close stream: {}", e);
        }

        // The read task ends on its own once the server completes the
        // close handshake; the timeout bounds a server that never does.
        if timeout(CLOSE_DRAIN_TIMEOUT, &mut self.receiver_task)
            .await
            .is_err()
        {
            warn!("Read side did not finish within the drain window, aborting");
            self.receiver_task.abort();
        }

        info!("Transcription stream closed");
    }
}

impl Drop for TranscriptionStream {
    fn drop(&mut self) {
        self.receiver_task.abort();
    }
}
