//! Wire types for the streaming transcription protocol
//!
//! The first client message on a freshly opened stream is the JSON
//! `DecoderConfig`; every following client message is a binary frame of
//! raw LINEAR16 audio. The client signals end of input with the `EOS`
//! text marker. Server messages are JSON `StreamingResponse` lists.

use serde::{Deserialize, Serialize};

/// End-of-input marker sent as the last client message
pub const END_OF_STREAM: &str = "EOS";

/// Session parameters sent as the first message of every (re)opened stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub sample_rate: u32,
    /// Audio encoding of the binary frames; always LINEAR16 here
    pub encoding: String,
    pub model_name: String,
    pub use_itn: bool,
    pub use_disfluency_filter: bool,
    pub use_profanity_filter: bool,
    /// Keyword boosting list
    pub keywords: Vec<String>,
}

/// One server response unit: a batch of results in arrival order
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingResponse {
    #[serde(default)]
    pub results: Vec<SpeechResult>,
}

/// A single transcription hypothesis batch
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechResult {
    /// True once the server will not revise this span again
    #[serde(default)]
    pub is_final: bool,
    /// Candidates, best first
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl SpeechResult {
    /// Text of the top candidate, empty when the server sent none
    pub fn top_text(&self) -> &str {
        self.alternatives.first().map(|a| a.text.as_str()).unwrap_or("")
    }
}

/// One transcription candidate
#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_config_serializes_with_original_field_names() {
        let config = DecoderConfig {
            sample_rate: 16000,
            encoding: "LINEAR16".to_string(),
            model_name: "sommers_ko".to_string(),
            use_itn: true,
            use_disfluency_filter: false,
            use_profanity_filter: false,
            keywords: vec![],
        };

        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("\"sample_rate\":16000"));
        assert!(json.contains("\"encoding\":\"LINEAR16\""));
        assert!(json.contains("\"model_name\":\"sommers_ko\""));
        assert!(json.contains("\"use_itn\":true"));
        assert!(json.contains("\"keywords\":[]"));
    }

    #[test]
    fn streaming_response_deserializes() {
        let json = r#"{
            "results": [
                {
                    "is_final": false,
                    "alternatives": [
                        {"text": "hello wor", "confidence": 0.81},
                        {"text": "hello were", "confidence": 0.12}
                    ]
                }
            ]
        }"#;

        let response: StreamingResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.results.len(), 1);
        let result = &response.results[0];
        assert!(!result.is_final);
        assert_eq!(result.top_text(), "hello wor");
        assert_eq!(result.alternatives[0].confidence, Some(0.81));
    }

    #[test]
    fn empty_response_body_is_tolerated() {
        let response: StreamingResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());

        let result: SpeechResult = serde_json::from_str("{}").unwrap();
        assert!(!result.is_final);
        assert_eq!(result.top_text(), "");
    }
}
