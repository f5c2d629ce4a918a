use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::client::ProjectClient;
use crate::errors::{error_object_message, FoundryError, FoundryResult};
use crate::models::agent::Agent;
use crate::models::message::Message;
use crate::models::response::Response;
use crate::retry::with_retry;

/// Names the agent that should answer; the service applies its instructions and tools
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "agent_reference")]
pub struct AgentReference {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRequest {
    pub agent: AgentReference,
    pub input: Vec<Message>,
}

impl ResponseRequest {
    /// Checked before anything goes on the wire: at least one turn, the last
    /// one from the user, and no blank content.
    pub fn new(agent: &Agent, turns: &[Message]) -> FoundryResult<Self> {
        let last = turns.last().ok_or_else(|| {
            FoundryError::InvalidRequest("a conversation needs at least one message".into())
        })?;
        if !last.is_user() {
            return Err(FoundryError::InvalidRequest(format!(
                "the last message must come from the user, got {}",
                last.role
            )));
        }
        if let Some(index) = turns.iter().position(|m| m.content.trim().is_empty()) {
            return Err(FoundryError::InvalidRequest(format!(
                "message {} has no content",
                index
            )));
        }

        Ok(Self {
            agent: AgentReference {
                name: agent.name.clone(),
            },
            input: turns.to_vec(),
        })
    }
}

impl ProjectClient {
    /// Send the conversation to `agent` and wait for its reply.
    ///
    /// Nothing is kept server side between calls; pass earlier turns in `turns`
    /// to continue a conversation.
    pub async fn send_message(&self, agent: &Agent, turns: &[Message]) -> FoundryResult<Response> {
        let request = ResponseRequest::new(agent, turns)?;
        let url = self.url(&["openai", "responses"], &[])?;
        debug!("sending {} turns to {}", request.input.len(), agent.name);

        let response: Response =
            with_retry(&self.options().retry, || self.post_json(url.clone(), &request)).await?;

        if response.is_failed() {
            let message = response
                .error
                .as_ref()
                .and_then(|error| error_object_message(&json!({ "error": error })))
                .unwrap_or_else(|| format!("response {} failed", response.id));
            return Err(FoundryError::service(message));
        }

        info!(
            "response {} from {} ({} output items)",
            response.id,
            agent.name,
            response.output.len()
        );
        Ok(response)
    }

    /// Single-turn shorthand for [`ProjectClient::send_message`]
    pub async fn ask(&self, agent: &Agent, text: &str) -> FoundryResult<Response> {
        self.send_message(agent, &[Message::user(text)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::credentials::static_token::StaticTokenCredential;
    use crate::retry::RetryConfig;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn agent() -> Agent {
        Agent {
            id: "asst_1".into(),
            name: "DemoAgent".into(),
            versions: None,
        }
    }

    fn client_for(server: &MockServer) -> ProjectClient {
        let options = ClientOptions {
            retry: RetryConfig::none(),
            ..ClientOptions::default()
        };
        ProjectClient::connect_with_options(
            &format!("{}/api/projects/demo", server.uri()),
            Arc::new(StaticTokenCredential::new("test_token")),
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_request_shape() {
        let request = ResponseRequest::new(&agent(), &[Message::user("Hello")]).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "agent": {"type": "agent_reference", "name": "DemoAgent"},
                "input": [{"role": "user", "content": "Hello"}]
            })
        );
    }

    #[test]
    fn test_request_validation() {
        let agent = agent();
        let cases: Vec<Vec<Message>> = vec![
            vec![],
            vec![Message::user("Hi"), Message::assistant("Hello!")],
            vec![Message::user("   ")],
            vec![Message::assistant(""), Message::user("Hi")],
        ];
        for turns in cases {
            let result = ResponseRequest::new(&agent, &turns);
            assert!(
                matches!(result, Err(FoundryError::InvalidRequest(_))),
                "{:?} should be rejected",
                turns
            );
        }

        let history = [
            Message::user("Hi"),
            Message::assistant("Hello!"),
            Message::user("What can you do?"),
        ];
        assert_eq!(ResponseRequest::new(&agent, &history).unwrap().input.len(), 3);
    }

    #[tokio::test]
    async fn test_ask() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/projects/demo/openai/responses"))
            .and(body_json(json!({
                "agent": {"type": "agent_reference", "name": "DemoAgent"},
                "input": [{"role": "user", "content": "Tell me what you can help with."}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_1",
                "status": "completed",
                "output": [{
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "I can answer questions.", "annotations": []}]
                }],
                "usage": {"input_tokens": 12, "output_tokens": 5, "total_tokens": 17}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = client_for(&mock_server)
            .ask(&agent(), "Tell me what you can help with.")
            .await
            .unwrap();
        assert_eq!(response.id, "resp_1");
        assert_eq!(response.output_text(), "I can answer questions.");
    }

    #[tokio::test]
    async fn test_failed_response_is_service_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_2",
                "status": "failed",
                "output": [],
                "error": {"code": "server_error", "message": "model deployment unavailable"}
            })))
            .mount(&mock_server)
            .await;

        match client_for(&mock_server).ask(&agent(), "Hi").await {
            Err(FoundryError::Service { message, .. }) => {
                assert!(message.contains("model deployment unavailable"))
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_turns_make_no_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).send_message(&agent(), &[]).await;
        assert!(matches!(result, Err(FoundryError::InvalidRequest(_))));
    }
}
