// Session coordinator: drives capture -> transcode -> stream -> presenter
//
// One pump loop pulls frames in capture order, transcodes them, verifies
// the access token before every send, and forwards the chunk on the
// current stream. Token expiry mid-session triggers a close/refresh/reopen
// re-handshake; the chunk in flight is held across the gap and sent first
// on the new stream, and frames produced meanwhile queue in the bounded
// capture channel, so nothing is dropped or reordered.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::audio::{transcode, AudioBackend};
use crate::auth::{epoch_now, TokenManager};
use crate::presenter::TranscriptPresenter;
use crate::stt::{DecoderConfig, SpeechResult, TranscriptionStream};

use super::config::SessionConfig;

/// Capacity of the result fan-in channel feeding the presenter
const RESULTS_CHANNEL_CAPACITY: usize = 100;

/// Owns the full lifecycle of one transcription session
pub struct SessionCoordinator {
    stream_url: String,
    session: SessionConfig,
    tokens: TokenManager,
    backend: Box<dyn AudioBackend>,
}

impl SessionCoordinator {
    pub fn new(
        stream_url: String,
        session: SessionConfig,
        tokens: TokenManager,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        Self {
            stream_url,
            session,
            tokens,
            backend,
        }
    }

    /// Run until cancellation, source end, or a terminal error
    ///
    /// Teardown always runs, exactly once, before this returns.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let decoder_config = self.session.to_decoder_config();

        // authenticate
        self.tokens
            .fetch()
            .await
            .context("Initial token fetch failed")?;

        // Result fan-in. Each (re)opened stream forwards into a clone of
        // this sender, so the presenter survives re-handshakes.
        let (results_tx, results_rx) = mpsc::channel(RESULTS_CHANNEL_CAPACITY);
        let presenter_task = tokio::spawn(present_results(results_rx));

        // open stream
        let token = self.tokens.require_current()?;
        let mut stream =
            TranscriptionStream::open(&self.stream_url, &decoder_config, token, results_tx.clone())
                .await
                .context("Failed to open transcription stream")?;

        // start capture
        let mut frames = self
            .backend
            .start()
            .await
            .context("Failed to start audio capture")?;

        info!(
            "Session started ({}, {}Hz, model {})",
            self.backend.name(),
            self.session.sample_rate,
            self.session.model_name
        );

        let mut pump_error: Option<anyhow::Error> = None;

        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping pump loop");
                    break;
                }
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => {
                        info!("Capture source ended");
                        break;
                    }
                },
            };

            // A single bad frame is not fatal.
            let chunk = match transcode(&frame) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Skipping frame: {}", e);
                    continue;
                }
            };

            // Validity is re-checked immediately before every send; there
            // is no cached check and no background refresh timer.
            let valid = self
                .tokens
                .current()
                .map(|t| t.is_valid(epoch_now()))
                .unwrap_or(false);

            if !valid {
                if let Err(e) = self
                    .rehandshake(&decoder_config, &results_tx, &mut stream)
                    .await
                {
                    pump_error = Some(e);
                    break;
                }
            }

            // The send is awaited here, so a failure stops the loop before
            // the next chunk goes out.
            if let Err(e) = stream.send(chunk).await {
                error!("Send failed, stopping session: {}", e);
                pump_error = Some(e.into());
                break;
            }
        }

        self.teardown(&mut stream).await;

        // Closing the last sender ends the presenter once buffered results
        // are drained.
        drop(results_tx);
        drop(stream);
        if let Err(e) = presenter_task.await {
            warn!("Presenter task panicked: {}", e);
        }

        match pump_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Close the current stream, refresh the token, open a fresh stream
    ///
    /// The new stream re-sends the session config as its first message.
    /// Chunks produced during the gap stay queued in the capture channel
    /// and drain in their original order once the caller resumes sending.
    async fn rehandshake(
        &mut self,
        decoder_config: &DecoderConfig,
        results_tx: &mpsc::Sender<SpeechResult>,
        stream: &mut TranscriptionStream,
    ) -> Result<()> {
        info!("Access token expired, re-opening stream");

        stream.close().await;

        let token = self
            .tokens
            .fetch()
            .await
            .context("Mid-session token refresh failed")?;

        *stream = TranscriptionStream::open(
            &self.stream_url,
            decoder_config,
            token,
            results_tx.clone(),
        )
        .await
        .context("Failed to re-open transcription stream")?;

        Ok(())
    }

    /// Best-effort teardown; every step runs even if an earlier one failed
    async fn teardown(&mut self, stream: &mut TranscriptionStream) {
        info!("Tearing down session");

        if let Err(e) = self.backend.stop().await {
            error!("Failed to stop audio capture: {}", e);
        }

        stream.close().await;
    }
}

/// Presenter task: renders results in arrival order until the channel closes
async fn present_results(mut results_rx: mpsc::Receiver<SpeechResult>) {
    let mut presenter = TranscriptPresenter::stdout();

    while let Some(result) = results_rx.recv().await {
        if let Err(e) = presenter.handle(&result) {
            warn!("Failed to write transcript: {}", e);
            break;
        }
    }
}
