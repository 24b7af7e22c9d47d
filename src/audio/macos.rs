// macOS audio backend using ScreenCaptureKit for system audio

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::screencapture;

/// macOS audio backend
///
/// Captures system audio using ScreenCaptureKit (macOS 13.0+)
pub struct MacOsBackend {
    config: AudioBackendConfig,
    session: Option<screencapture::ScreenCaptureSession>,
    capturing: bool,
}

impl MacOsBackend {
    pub fn new(config: AudioBackendConfig) -> Result<Self> {
        if !screencapture::is_available() {
            bail!(
                "ScreenCaptureKit is not available on this system. \
                Requires macOS 13.0 (Ventura) or later."
            );
        }

        info!(
            "macOS backend initialized ({}Hz, {} channels)",
            config.sample_rate, config.channels
        );

        Ok(Self {
            config,
            session: None,
            capturing: false,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for MacOsBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("Already capturing");
        }

        info!("Starting ScreenCaptureKit system-audio capture");

        let mut session =
            screencapture::ScreenCaptureSession::new(self.config.sample_rate, self.config.channels);

        let rx = session.start()?;

        self.session = Some(session);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping macOS audio capture");

        if let Some(mut session) = self.session.take() {
            session.stop()?;
        }

        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "macOS ScreenCaptureKit"
    }
}
