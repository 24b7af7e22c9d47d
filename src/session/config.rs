use serde::{Deserialize, Serialize};

use crate::stt::DecoderConfig;

/// Negotiated parameters for one transcription session
///
/// Built once at startup and immutable afterwards; converted to the wire
/// config and re-sent as the first message of every (re)opened stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sample rate of the audio sent on the stream (8000..=48000)
    pub sample_rate: u32,

    /// Channels requested from the capture layer
    pub channels: u16,

    /// STT model name
    pub model_name: String,

    /// Convert English, numbers and units in the transcript
    pub use_itn: bool,

    /// Filter filler words
    pub use_disfluency_filter: bool,

    /// Filter profanity
    pub use_profanity_filter: bool,

    /// Keyword boosting list
    pub keywords: Vec<String>,
}

impl SessionConfig {
    /// Wire config sent as the stream's first message
    pub fn to_decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            sample_rate: self.sample_rate,
            encoding: "LINEAR16".to_string(),
            model_name: self.model_name.clone(),
            use_itn: self.use_itn,
            use_disfluency_filter: self.use_disfluency_filter,
            use_profanity_filter: self.use_profanity_filter,
            keywords: self.keywords.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            model_name: "sommers_ko".to_string(),
            use_itn: true,
            use_disfluency_filter: false,
            use_profanity_filter: false,
            keywords: Vec::new(),
        }
    }
}
