pub mod backend;
pub mod file;
pub mod transcode;

#[cfg(target_os = "macos")]
pub mod macos;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, SampleFormat,
};
pub use file::FileBackend;
pub use transcode::{transcode, PcmChunk};
