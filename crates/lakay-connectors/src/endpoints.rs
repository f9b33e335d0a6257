//! Endpoint resolver — fixed per-service MCP URL templates on the Composio
//! partner route.

use lakay_core::{Error, Result};
use url::form_urlencoded;

use crate::types::{ServiceInfo, UserIdentity};

/// Partner route every hosted MCP connector lives under.
pub const MCP_BASE_URL: &str = "https://mcp.composio.dev/partner/composio";

/// Integrator tag sent as `agent=` on every endpoint.
pub const PARTNER_AGENT: &str = "lakayAI";

/// Services with a known endpoint template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    Gmail,
    Outlook,
    SharePoint,
    LinkedIn,
    YouTube,
    Teams,
    GoogleTasks,
    Search,
    TextToPdf,
    Memory,
    MemoryO,
}

impl ServiceKey {
    pub fn all() -> &'static [ServiceKey] {
        &[
            Self::Gmail,
            Self::Outlook,
            Self::SharePoint,
            Self::LinkedIn,
            Self::YouTube,
            Self::Teams,
            Self::GoogleTasks,
            Self::Search,
            Self::TextToPdf,
            Self::Memory,
            Self::MemoryO,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
            Self::SharePoint => "sharePoint",
            Self::LinkedIn => "linkedin",
            Self::YouTube => "youtube",
            Self::Teams => "teams",
            Self::GoogleTasks => "googleTasks",
            Self::Search => "search",
            Self::TextToPdf => "textToPdf",
            Self::Memory => "memory",
            Self::MemoryO => "memoryO",
        }
    }

    /// Name given to the connector record when this service is added.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gmail => "Gmail",
            Self::Outlook => "Outlook",
            Self::SharePoint => "SharePoint",
            Self::LinkedIn => "LinkedIn",
            Self::YouTube => "YouTube",
            Self::Teams => "Microsoft Teams",
            Self::GoogleTasks => "Google Tasks",
            Self::Search => "Search",
            Self::TextToPdf => "Text to PDF",
            Self::Memory => "Memory",
            Self::MemoryO => "Memory O",
        }
    }

    /// Composio app slug.
    pub fn app(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
            Self::SharePoint => "share_point",
            Self::LinkedIn => "linkedin",
            Self::YouTube => "youtube",
            Self::Teams => "microsoft_teams",
            Self::GoogleTasks => "googletasks",
            Self::Search => "composio_search",
            Self::TextToPdf => "text_to_pdf",
            Self::Memory => "zep",
            Self::MemoryO => "mem0",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|s| s.key().eq_ignore_ascii_case(key))
    }

    /// Build this service's endpoint for `identity`. Only the customer id
    /// varies between users.
    pub fn endpoint(&self, identity: &UserIdentity) -> String {
        format!(
            "{}/{}?customerId={}&agent={}",
            MCP_BASE_URL,
            self.app(),
            encode(&identity.customer_id),
            PARTNER_AGENT
        )
    }

    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            key: self.key().to_string(),
            display_name: self.display_name().to_string(),
            app: self.app().to_string(),
        }
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Resolve `service_key` to the endpoint for `identity`.
pub fn resolve(service_key: &str, identity: &UserIdentity) -> Result<String> {
    ServiceKey::from_key(service_key)
        .map(|service| service.endpoint(identity))
        .ok_or_else(|| Error::UnknownService(service_key.to_string()))
}

// Injective: '+' and '&' are escaped, so distinct ids never collide.
fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
