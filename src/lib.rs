pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod presenter;
pub mod screencapture;
pub mod session;
pub mod stt;

pub use audio::{
    transcode, AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
    PcmChunk, SampleFormat,
};
pub use auth::{Token, TokenManager};
pub use config::{Config, Credentials};
pub use error::{AuthError, ConversionError, StreamError};
pub use presenter::TranscriptPresenter;
pub use session::{SessionConfig, SessionCoordinator};
pub use stt::{DecoderConfig, SpeechResult, TranscriptionStream};
