use anyhow::Result;
use tokio::sync::mpsc;

/// Sample format of a raw captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 32-bit IEEE float, little-endian (ScreenCaptureKit native)
    F32,
    /// 16-bit signed integer, little-endian
    I16,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::I16 => 2,
        }
    }
}

/// One raw capture unit, exactly as the capture layer delivered it
///
/// A frame is owned by the producer until handed to the transcoder and is
/// not retained afterwards.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw sample bytes in the source format
    pub bytes: Vec<u8>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Source sample format; `None` when the capture layer could not
    /// describe the stream (the transcoder rejects such frames)
    pub format: Option<SampleFormat>,
    /// Whether channels are interleaved in the payload
    pub interleaved: bool,
}

impl AudioFrame {
    /// Number of whole frames in the payload, if the format is known and
    /// the payload divides evenly
    pub fn frame_count(&self) -> Option<usize> {
        let format = self.format?;
        let frame_size = format.sample_size() * self.channels as usize;
        if frame_size == 0 || self.bytes.len() % frame_size != 0 {
            return None;
        }
        Some(self.bytes.len() / frame_size)
    }
}

/// Configuration for an audio capture backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate requested from the capture layer
    pub sample_rate: u32,
    /// Channel count requested from the capture layer
    pub channels: u16,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // streaming STT session rate
            channels: 1,
        }
    }
}

/// Audio capture backend trait
///
/// Platform-specific implementations:
/// - macOS: ScreenCaptureKit system-audio tap
/// - File: read frames from a WAV file (offline runs, tests)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver yielding frames in capture order. The
    /// channel closes when the source ends or `stop` is called; capture
    /// layer errors also surface as channel closure.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release capture resources
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create an audio backend for the given source
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::System => {
                #[cfg(target_os = "macos")]
                {
                    use super::macos::MacOsBackend;
                    let backend = MacOsBackend::new(config)?;
                    Ok(Box::new(backend))
                }

                #[cfg(not(target_os = "macos"))]
                {
                    anyhow::bail!("System audio capture is only supported on macOS")
                }
            }

            AudioSource::File(path) => {
                let backend = super::file::FileBackend::new(path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// System audio (macOS ScreenCaptureKit only)
    System,
    /// WAV file input (offline runs, tests)
    File(String),
}
