use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::Role;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    /// The reported total, or input plus output when the service omits it
    pub fn total(&self) -> Option<i32> {
        self.total_tokens
            .or(match (self.input_tokens, self.output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Content part of a generated message
pub enum OutputContent {
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<Value>,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Item in a response's `output`. Tool calls and reasoning items are not inspected.
pub enum OutputItem {
    Message {
        #[serde(default)]
        id: Option<String>,
        role: Role,
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A generated turn plus metadata, as returned by the responses endpoint
pub struct Response {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default, rename = "output_text", skip_serializing_if = "Option::is_none")]
    aggregated_text: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    /// The text of the reply: the server's aggregate when it sends one,
    /// otherwise every `output_text` part of the assistant messages joined in order.
    pub fn output_text(&self) -> String {
        if let Some(text) = self.aggregated_text.as_ref().filter(|t| !t.is_empty()) {
            return text.clone();
        }

        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message {
                    role: Role::Assistant,
                    content,
                    ..
                } => Some(content),
                _ => None,
            })
            .flatten()
            .filter_map(|part| match part {
                OutputContent::OutputText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Refusals the agent produced instead of an answer, if any
    pub fn refusals(&self) -> Vec<&str> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message { content, .. } => Some(content),
                OutputItem::Other => None,
            })
            .flatten()
            .filter_map(|part| match part {
                OutputContent::Refusal { refusal } => Some(refusal.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("failed")
            || self.error.as_ref().is_some_and(|e| !e.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_text_from_items() -> serde_json::Result<()> {
        let response: Response = serde_json::from_value(json!({
            "id": "resp_1",
            "object": "response",
            "status": "completed",
            "output": [
                {"type": "reasoning", "id": "rs_1", "summary": []},
                {
                    "type": "message",
                    "id": "msg_1",
                    "role": "assistant",
                    "content": [
                        {"type": "output_text", "text": "I can help ", "annotations": []},
                        {"type": "output_text", "text": "with tasks."}
                    ]
                }
            ],
            "usage": {"input_tokens": 12, "output_tokens": 8, "total_tokens": 20}
        }))?;

        assert_eq!(response.output_text(), "I can help with tasks.");
        assert_eq!(response.output.len(), 2);
        assert_eq!(response.output[0], OutputItem::Other);
        assert_eq!(response.usage.as_ref().and_then(|u| u.total_tokens), Some(20));
        assert!(!response.is_failed());
        Ok(())
    }

    #[test]
    fn test_server_aggregate_wins() -> serde_json::Result<()> {
        let response: Response = serde_json::from_value(json!({
            "id": "resp_2",
            "output_text": "aggregated",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{"type": "output_text", "text": "parts"}]
            }]
        }))?;
        assert_eq!(response.output_text(), "aggregated");
        Ok(())
    }

    #[test]
    fn test_refusal_and_failure() -> serde_json::Result<()> {
        let response: Response = serde_json::from_value(json!({
            "id": "resp_3",
            "status": "failed",
            "error": {"code": "server_error", "message": "agent crashed"},
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{"type": "refusal", "refusal": "I can't do that."}]
            }]
        }))?;
        assert!(response.is_failed());
        assert_eq!(response.output_text(), "");
        assert_eq!(response.refusals(), vec!["I can't do that."]);
        Ok(())
    }

    #[test]
    fn test_usage_total_is_derived() -> serde_json::Result<()> {
        let usage: Usage = serde_json::from_value(json!({"input_tokens": 10, "output_tokens": 20}))?;
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.total(), Some(30));

        let reported: Usage = serde_json::from_value(
            json!({"input_tokens": 10, "output_tokens": 20, "total_tokens": 35}),
        )?;
        assert_eq!(reported.total(), Some(35));
        Ok(())
    }
}
