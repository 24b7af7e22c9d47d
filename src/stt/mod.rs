pub mod protocol;
pub mod stream;

pub use protocol::{Alternative, DecoderConfig, SpeechResult, StreamingResponse, END_OF_STREAM};
pub use stream::TranscriptionStream;
