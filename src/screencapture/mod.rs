// Rust FFI interface to the Swift ScreenCaptureKit bridge
//
// Platform: macOS 13.0+ only
//
// The bridge taps system audio only; video sample buffers are discarded on
// the Swift side and never cross this boundary. Frames arrive in the
// format ScreenCaptureKit negotiated (float32 in practice) and are handed
// to the transcoder untouched.

use anyhow::{bail, Result};
use tokio::sync::mpsc;
#[cfg(target_os = "macos")]
use tracing::{info, warn};

use crate::audio::backend::AudioFrame;
#[cfg(any(target_os = "macos", test))]
use crate::audio::backend::SampleFormat;

/// Capacity of the capture handoff channel. Bounds the audio buffered
/// between the push-based bridge callback and the pull-based pump loop;
/// on overflow the newest frame is dropped with a warning.
pub const CAPTURE_CHANNEL_CAPACITY: usize = 256;

// MARK: - FFI declarations

#[cfg(target_os = "macos")]
#[link(name = "sysaudio_screencapture", kind = "static")]
extern "C" {
    fn sysaudio_screencapture_is_available() -> bool;

    fn sysaudio_screencapture_start(
        sample_rate: u32,
        channels: u16,
        callback: extern "C" fn(*const u8, i32, u32, u16, u8),
    ) -> i32;

    fn sysaudio_screencapture_stop() -> i32;
}

// MARK: - Safe Rust interface

/// Check if ScreenCaptureKit is available on this system
#[cfg(target_os = "macos")]
pub fn is_available() -> bool {
    unsafe { sysaudio_screencapture_is_available() }
}

#[cfg(not(target_os = "macos"))]
pub fn is_available() -> bool {
    false
}

/// Format codes used on the FFI boundary
#[cfg(any(target_os = "macos", test))]
const FORMAT_F32: u8 = 0;
#[cfg(any(target_os = "macos", test))]
const FORMAT_I16: u8 = 1;

#[cfg(any(target_os = "macos", test))]
fn decode_format(code: u8) -> Option<SampleFormat> {
    match code {
        FORMAT_F32 => Some(SampleFormat::F32),
        FORMAT_I16 => Some(SampleFormat::I16),
        _ => None, // bridge could not describe the stream
    }
}

/// ScreenCaptureKit audio capture session
#[cfg(target_os = "macos")]
pub struct ScreenCaptureSession {
    sample_rate: u32,
    channels: u16,
    audio_tx: Option<mpsc::Sender<AudioFrame>>,
}

#[cfg(target_os = "macos")]
impl ScreenCaptureSession {
    /// Create a new capture session
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            audio_tx: None,
        }
    }

    /// Start capturing system audio
    ///
    /// Returns a channel receiver that will receive raw audio frames in
    /// capture order.
    pub fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if !is_available() {
            bail!("ScreenCaptureKit is not available (requires macOS 13.0+)");
        }

        info!(
            "Starting ScreenCaptureKit capture ({}Hz, {} channels)",
            self.sample_rate, self.channels
        );

        let (tx, rx) = mpsc::channel(CAPTURE_CHANNEL_CAPACITY);
        self.audio_tx = Some(tx.clone());

        let tx_ptr = Box::into_raw(Box::new(tx));

        unsafe {
            GLOBAL_AUDIO_TX = tx_ptr;
        }

        let result =
            unsafe { sysaudio_screencapture_start(self.sample_rate, self.channels, audio_callback) };

        if result != 0 {
            bail!("Failed to start ScreenCaptureKit capture (error code: {})", result);
        }

        Ok(rx)
    }

    /// Stop capturing audio
    ///
    /// Dropping the sender closes the frame sequence, which signals
    /// completion to the pump loop without a sentinel value.
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping ScreenCaptureKit capture");

        let result = unsafe { sysaudio_screencapture_stop() };

        unsafe {
            if !GLOBAL_AUDIO_TX.is_null() {
                let _ = Box::from_raw(GLOBAL_AUDIO_TX);
                GLOBAL_AUDIO_TX = std::ptr::null_mut();
            }
        }

        self.audio_tx = None;

        if result != 0 {
            bail!("Failed to stop ScreenCaptureKit capture (error code: {})", result);
        }

        Ok(())
    }

    /// Check if currently capturing
    pub fn is_capturing(&self) -> bool {
        self.audio_tx.is_some()
    }
}

// MARK: - Audio callback

#[cfg(target_os = "macos")]
static mut GLOBAL_AUDIO_TX: *mut mpsc::Sender<AudioFrame> = std::ptr::null_mut();

#[cfg(target_os = "macos")]
extern "C" fn audio_callback(
    bytes_ptr: *const u8,
    byte_count: i32,
    sample_rate: u32,
    channels: u16,
    format_code: u8,
) {
    if bytes_ptr.is_null() || byte_count <= 0 {
        return;
    }

    unsafe {
        if GLOBAL_AUDIO_TX.is_null() {
            warn!("Audio callback fired but sender is null");
            return;
        }

        let tx = &*GLOBAL_AUDIO_TX;

        let bytes = std::slice::from_raw_parts(bytes_ptr, byte_count as usize).to_vec();

        let frame = AudioFrame {
            bytes,
            sample_rate,
            channels,
            format: decode_format(format_code),
            interleaved: true,
        };

        // Non-blocking: the callback runs on the capture queue and must
        // not wait on the consumer. Overflow drops this frame.
        if let Err(e) = tx.try_send(frame) {
            warn!("Capture channel full, dropping frame: {}", e);
        }
    }
}

// MARK: - Placeholder for non-macOS platforms

#[cfg(not(target_os = "macos"))]
pub struct ScreenCaptureSession;

#[cfg(not(target_os = "macos"))]
impl ScreenCaptureSession {
    pub fn new(_sample_rate: u32, _channels: u16) -> Self {
        Self
    }

    pub fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        bail!("ScreenCaptureKit is only available on macOS")
    }

    pub fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        false
    }
}
