use anyhow::{Context, Result};
use hound::WavReader;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame, SampleFormat};

/// Samples per emitted frame (per channel), ~100ms at 16kHz
const SAMPLES_PER_FRAME: usize = 1600;

/// WAV-file capture backend
///
/// Plays a 16-bit WAV file into the pipeline as a finite sequence of
/// frames. Used for offline runs and integration tests; the sequence ends
/// when the file is exhausted.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    capturing: bool,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            config,
            capturing: false,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let reader = WavReader::open(&self.path)
            .with_context(|| format!("Failed to open WAV file: {}", self.path.display()))?;

        let spec = reader.spec();
        anyhow::ensure!(
            spec.bits_per_sample == 16 && spec.sample_format == hound::SampleFormat::Int,
            "Only 16-bit integer WAV input is supported, got {}-bit {:?}",
            spec.bits_per_sample,
            spec.sample_format
        );

        info!(
            "Reading WAV source: {} ({}Hz, {} channels)",
            self.path.display(),
            spec.sample_rate,
            spec.channels
        );

        // The file is streamed as-is; the session rate is negotiated from
        // config, so a mismatch means the server hears wrong-speed audio.
        if spec.sample_rate != self.config.sample_rate {
            warn!(
                "WAV sample rate {}Hz differs from session rate {}Hz",
                spec.sample_rate, self.config.sample_rate
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(async move {
            let batch = SAMPLES_PER_FRAME * spec.channels as usize;
            for window in samples.chunks(batch) {
                let frame = AudioFrame {
                    bytes: window.iter().flat_map(|s| s.to_le_bytes()).collect(),
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    format: Some(SampleFormat::I16),
                    interleaved: true,
                };
                if tx.send(frame).await.is_err() {
                    break; // consumer gone
                }
            }
            // dropping tx closes the sequence
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
        "WAV file"
    }
}
