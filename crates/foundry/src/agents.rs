use std::collections::HashSet;
use tracing::{debug, info};

use crate::client::ProjectClient;
use crate::errors::{FoundryError, FoundryResult};
use crate::models::agent::{Agent, AgentList};
use crate::retry::with_retry;

impl ProjectClient {
    /// Resolve an agent by its unique name within the project
    pub async fn get_agent_by_name(&self, name: &str) -> FoundryResult<Agent> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FoundryError::InvalidRequest("agent name is empty".into()));
        }

        let url = self.url(&["agents", name], &[])?;
        let agent: Agent = with_retry(&self.options().retry, || self.get_json(url.clone()))
            .await
            .map_err(|err| match err {
                FoundryError::NotFound(detail) => FoundryError::NotFound(format!(
                    "agent '{}' does not exist in this project ({})",
                    name, detail
                )),
                other => other,
            })?;

        if agent.name != name {
            return Err(FoundryError::service(format!(
                "asked for agent '{}' but the service returned '{}'",
                name, agent.name
            )));
        }

        info!("resolved agent {} ({})", agent.name, agent.id);
        Ok(agent)
    }

    /// Every agent in the project, following pagination
    pub async fn list_agents(&self) -> FoundryResult<Vec<Agent>> {
        let mut agents = Vec::new();
        let mut seen = HashSet::new();
        let mut after: Option<String> = None;

        loop {
            let query: Vec<(&str, &str)> = after.iter().map(|id| ("after", id.as_str())).collect();
            let url = self.url(&["agents"], &query)?;
            let page: AgentList = with_retry(&self.options().retry, || self.get_json(url.clone())).await?;
            debug!("listed {} agents, has_more={}", page.data.len(), page.has_more);

            agents.extend(page.data);

            match page.last_id {
                Some(last_id) if page.has_more && seen.insert(last_id.clone()) => {
                    after = Some(last_id)
                }
                _ => break,
            }
        }

        Ok(agents)
    }

    /// Resolve by scanning the listing, for services that do not support lookup by name
    pub async fn find_agent(&self, name: &str) -> FoundryResult<Agent> {
        let agents = self.list_agents().await?;
        let available: Vec<String> = agents.iter().map(|a| a.name.clone()).collect();

        agents
            .into_iter()
            .find(|agent| agent.name == name)
            .ok_or_else(|| {
                FoundryError::NotFound(format!(
                    "agent '{}' not found, available agents: [{}]",
                    name,
                    available.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::credentials::static_token::StaticTokenCredential;
    use crate::retry::RetryConfig;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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

    #[tokio::test]
    async fn test_get_agent_by_name() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/demo/agents/DemoAgent"))
            .and(query_param("api-version", "2025-11-15-preview"))
            .and(header("Authorization", "Bearer test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "agent",
                "id": "asst_1",
                "name": "DemoAgent"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let agent = client_for(&mock_server)
            .get_agent_by_name("DemoAgent")
            .await
            .unwrap();
        assert_eq!(agent.name, "DemoAgent");
        assert_eq!(agent.id, "asst_1");
    }

    #[tokio::test]
    async fn test_empty_name_makes_no_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).get_agent_by_name("  ").await;
        assert!(matches!(result, Err(FoundryError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": "PermissionDenied", "message": "principal lacks Azure AI User role"}
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).get_agent_by_name("DemoAgent").await;
        assert!(matches!(result, Err(FoundryError::Permission(_))));
    }

    #[tokio::test]
    async fn test_mismatched_name_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_2",
                "name": "OtherAgent"
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).get_agent_by_name("DemoAgent").await;
        assert!(matches!(result, Err(FoundryError::Service { .. })));
    }

    #[tokio::test]
    async fn test_list_agents_follows_pages() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/demo/agents"))
            .and(query_param("after", "asst_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "asst_3", "name": "Third"}],
                "has_more": false,
                "last_id": "asst_3"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/projects/demo/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "asst_1", "name": "First"},
                    {"id": "asst_2", "name": "DemoAgent"}
                ],
                "has_more": true,
                "last_id": "asst_2"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let names: Vec<String> = client
            .list_agents()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["First", "DemoAgent", "Third"]);
    }

    #[tokio::test]
    async fn test_find_agent_reports_available_names() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/demo/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "asst_1", "name": "First"}, {"id": "asst_2", "name": "Second"}],
                "has_more": false
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        assert_eq!(client.find_agent("Second").await.unwrap().id, "asst_2");

        match client.find_agent("DemoAgent").await {
            Err(FoundryError::NotFound(message)) => assert!(message.contains("First, Second")),
            other => panic!("expected not found, got {:?}", other),
        }
    }
}
