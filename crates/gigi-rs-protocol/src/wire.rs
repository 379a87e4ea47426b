//! Request and response bodies for the fixed backend HTTP surface.
//!
//! These shapes are a contract with the server and must not drift; field
//! renames preserve the exact JSON keys the endpoints expect.

use crate::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for `POST /assistant/api/chat/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Session identifier generated by the client.
    pub session_id: SessionId,
    /// Raw user message text.
    pub message: String,
}

/// Response from `POST /assistant/api/chat/`.
///
/// A 2xx response carries either a reply or a server-acknowledged logical
/// error; the latter is terminal and must not be requeued.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatResponse {
    /// Assistant reply in markdown.
    #[serde(default)]
    pub reply: Option<String>,
    /// Server-side logical error description.
    #[serde(default)]
    pub error: Option<String>,
}

/// Body for `POST /assistant/api/tts/`. The response is a binary audio
/// resource, not JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsRequest {
    /// Formatting-stripped text to synthesize.
    pub text: String,
    /// Voice identifier.
    pub voice: String,
    /// Playback speed multiplier.
    pub speed: f32,
    /// Whether the server may serve from its own cache.
    pub use_cache: bool,
}

/// Body for `POST /assistant/api/report/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRequest {
    /// Reporter name.
    pub name: String,
    /// Reporter contact email.
    pub email: String,
    /// Category of the reported issue.
    #[serde(rename = "bugType")]
    pub bug_type: String,
    /// Free-form description.
    pub description: String,
    /// Steps to reproduce.
    pub steps: String,
    /// Device description.
    pub device: String,
    /// Submission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Page URL at submission time.
    pub url: String,
    /// Browser user agent string.
    #[serde(rename = "userAgent")]
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, ChatResponse, ReportRequest, TtsRequest};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn chat_request_uses_snake_case_keys() {
        let request = ChatRequest {
            session_id: Uuid::new_v4(),
            message: "hello".to_string(),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert!(value.get("session_id").is_some());
        assert_eq!(value["message"], "hello");
    }

    #[test]
    fn chat_response_tolerates_missing_fields() {
        let reply: ChatResponse = serde_json::from_str(r#"{"reply":"hi"}"#).expect("reply");
        assert_eq!(reply.reply.as_deref(), Some("hi"));
        assert_eq!(reply.error, None);

        let error: ChatResponse = serde_json::from_str(r#"{"error":"overloaded"}"#).expect("error");
        assert_eq!(error.reply, None);
        assert_eq!(error.error.as_deref(), Some("overloaded"));
    }

    #[test]
    fn report_request_preserves_camel_case_contract_keys() {
        let report = ReportRequest {
            name: "a".to_string(),
            email: "a@b.c".to_string(),
            bug_type: "ui".to_string(),
            description: "d".to_string(),
            steps: "s".to_string(),
            device: "phone".to_string(),
            timestamp: Utc::now(),
            url: "https://example.com".to_string(),
            user_agent: "ua".to_string(),
        };
        let value = serde_json::to_value(&report).expect("serialize");
        assert!(value.get("bugType").is_some());
        assert!(value.get("userAgent").is_some());
        assert!(value.get("bug_type").is_none());
    }

    #[test]
    fn tts_request_shape() {
        let request = TtsRequest {
            text: "hello".to_string(),
            voice: "nova".to_string(),
            speed: 1.0,
            use_cache: true,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["voice"], "nova");
        assert_eq!(value["use_cache"], true);
    }
}
