//! Agent workspace files (`agents.files.*`).

use crate::api::call_typed;
use crate::error::api::ApiError;
use crate::protocol::methods;
use crate::session::GatewaySession;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// One file in an agent's workspace.
///
/// `missing` entries are files the agent may have but does not yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFileEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilesListResult {
    #[serde(default)]
    files: Vec<AgentFileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileResult {
    file: AgentFileEntry,
}

#[derive(Clone)]
pub struct AgentFilesClient {
    session: GatewaySession,
}

impl AgentFilesClient {
    pub fn new(session: GatewaySession) -> Self {
        Self { session }
    }

    /// Every known file for `agent_id`, including missing ones.
    pub async fn list_files(&self, agent_id: &str) -> Result<Vec<AgentFileEntry>, ApiError> {
        let result: FilesListResult = call_typed(
            &self.session,
            methods::AGENTS_FILES_LIST,
            json!({ "agentId": agent_id }),
            "Failed to list files",
        )
        .await?;
        Ok(result.files)
    }

    /// Names of the files that exist.
    pub async fn list_workspace_files(&self, agent_id: &str) -> Result<Vec<String>, ApiError> {
        let files = self.list_files(agent_id).await?;
        Ok(files
            .into_iter()
            .filter(|file| !file.missing)
            .map(|file| file.name)
            .collect())
    }

    /// One file with its content populated.
    pub async fn get_file(&self, agent_id: &str, name: &str) -> Result<AgentFileEntry, ApiError> {
        let result: FileResult = call_typed(
            &self.session,
            methods::AGENTS_FILES_GET,
            json!({ "agentId": agent_id, "name": name }),
            &format!("Failed to get file: {name}"),
        )
        .await?;
        Ok(result.file)
    }

    /// File content, or the empty string when the file is missing.
    pub async fn read_file(&self, agent_id: &str, name: &str) -> Result<String, ApiError> {
        let file = self.get_file(agent_id, name).await?;
        if file.missing {
            return Ok(String::new());
        }
        Ok(file.content.unwrap_or_default())
    }

    /// Create or replace a file.
    pub async fn set_file(
        &self,
        agent_id: &str,
        name: &str,
        content: &str,
    ) -> Result<AgentFileEntry, ApiError> {
        let result: FileResult = call_typed(
            &self.session,
            methods::AGENTS_FILES_SET,
            json!({ "agentId": agent_id, "name": name, "content": content }),
            &format!("Failed to save file: {name}"),
        )
        .await?;
        Ok(result.file)
    }
}
