use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// An agent hosted in a project. Read-only from this crate's point of view.
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<AgentVersions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVersions {
    pub latest: AgentVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVersion {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub definition: Option<AgentDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Service-side configuration. Carried through untouched.
pub struct AgentDefinition {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Value>,
}

impl Agent {
    pub fn latest(&self) -> Option<&AgentVersion> {
        self.versions.as_ref().map(|v| &v.latest)
    }

    pub fn definition(&self) -> Option<&AgentDefinition> {
        self.latest().and_then(|v| v.definition.as_ref())
    }

    pub fn model(&self) -> Option<&str> {
        self.definition().and_then(|d| d.model.as_deref())
    }
}

/// One page of the agent listing
#[derive(Debug, Clone, Deserialize)]
pub struct AgentList {
    #[serde(default)]
    pub data: Vec<Agent>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}
