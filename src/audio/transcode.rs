// PCM transcoder: raw captured frames -> 16-bit signed LE PCM
//
// Stateless. The capture layer delivers whatever format ScreenCaptureKit
// negotiated (float32 in practice); the streaming session wants LINEAR16.

use crate::error::ConversionError;

use super::backend::{AudioFrame, SampleFormat};

/// One transcoded audio unit: 16-bit signed little-endian PCM
///
/// Ownership moves into the network send, which consumes the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmChunk {
    /// Interleaved i16 LE sample bytes
    pub bytes: Vec<u8>,
    /// Sample rate in Hz, equal to the negotiated session rate
    pub sample_rate: u32,
}

/// Bytes per sample of the target format (i16)
const TARGET_SAMPLE_SIZE: usize = 2;

/// Convert a raw frame to the fixed target format
///
/// Fails on missing format metadata or a payload that is not a whole
/// number of frames; never truncates or pads. The output length is always
/// `frame_count * channels * 2` bytes.
pub fn transcode(frame: &AudioFrame) -> Result<PcmChunk, ConversionError> {
    let format = frame.format.ok_or(ConversionError::MissingFormat)?;

    // Only interleaved layouts have a converter; passing planar bytes
    // through would emit channel-scrambled PCM.
    if !frame.interleaved {
        return Err(ConversionError::NonInterleaved);
    }

    let frame_size = format.sample_size() * frame.channels as usize;
    if frame_size == 0 || frame.bytes.len() % frame_size != 0 {
        return Err(ConversionError::MalformedPayload {
            actual: frame.bytes.len(),
            frame_size: frame_size.max(1),
        });
    }

    let bytes = match format {
        SampleFormat::I16 => frame.bytes.clone(),
        SampleFormat::F32 => {
            let mut out = Vec::with_capacity(frame.bytes.len() / 2);
            for sample in frame.bytes.chunks_exact(4) {
                let value = f32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]);
                let scaled = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                out.extend_from_slice(&scaled.to_le_bytes());
            }
            out
        }
    };

    debug_assert_eq!(
        bytes.len(),
        frame.frame_count().unwrap_or(0) * frame.channels as usize * TARGET_SAMPLE_SIZE
    );

    Ok(PcmChunk {
        bytes,
        sample_rate: frame.sample_rate,
    })
}
