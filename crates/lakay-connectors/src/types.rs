//! Connector types — matching the JSON shapes the UI and chat runtime exchange.

use serde::{Deserialize, Serialize};

/// Storage key of the persisted connector list.
pub const CONNECTORS_STORAGE_KEY: &str = "mcpConfig";

/// Storage key of the persisted user identity.
pub const IDENTITY_STORAGE_KEY: &str = "lakayAI_user_identifiers";

/// A named reference to an external MCP server.
///
/// Records are immutable once added; an edit is a remove followed by an add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRecord {
    #[serde(rename = "serverName")]
    pub server_name: String,
    pub endpoint: String,
}

impl ConnectorRecord {
    pub fn new(server_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Locally generated identity used to parameterize per-user endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "agentId")]
    pub agent_id: String,
}

/// Request body for adding a custom connector.
#[derive(Debug, Clone, Deserialize)]
pub struct AddConnectorRequest {
    #[serde(rename = "serverName")]
    pub server_name: String,
    #[serde(default)]
    pub endpoint: String,
}

/// A recognized service, as listed to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub key: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Composio app slug in the endpoint path.
    pub app: String,
}

/// Classified result of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    Reachable,
    Unreachable {
        #[serde(rename = "statusCode")]
        status_code: u16,
    },
    Error {
        message: String,
    },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }

    /// One-line message for display next to the connector.
    pub fn summary(&self, server_name: &str) -> String {
        match self {
            Self::Reachable => format!("Connection to {} succeeded", server_name),
            Self::Unreachable { status_code } => {
                format!("Connection to {} failed (status {})", server_name, status_code)
            }
            Self::Error { message } => {
                format!("Connection error for {}: {}", server_name, message)
            }
        }
    }
}
