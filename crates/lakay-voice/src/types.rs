//! Delivery types — candidate chains and outcomes.

use serde::{Deserialize, Serialize};

/// One way of finding a widget affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub selector: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            selector: selector.into(),
        }
    }
}

/// Input surfaces, most widget-specific first.
pub fn default_input_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new("copilotkit-input", ".copilotkit-chat-input textarea"),
        Candidate::new("message-placeholder", r#"textarea[placeholder*="message"]"#),
        Candidate::new("tapez-placeholder", r#"textarea[placeholder*="Tapez"]"#),
        Candidate::new("copilotkit-chat", ".copilotkit-chat textarea"),
        Candidate::new("any-textarea", "textarea"),
        Candidate::new("text-input", r#"input[type="text"]"#),
    ]
}

/// Send controls, most widget-specific first.
pub fn default_submit_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new(
            "copilotkit-submit",
            r#".copilotkit-chat-input button[type="submit"]"#,
        ),
        Candidate::new("submit-button", r#"button[type="submit"]"#),
        Candidate::new("send-label", r#"button[aria-label*="send"]"#),
        Candidate::new("send-label-capital", r#"button[aria-label*="Send"]"#),
        Candidate::new("copilotkit-last-button", ".copilotkit-chat button:last-child"),
    ]
}

/// How the message was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "camelCase")]
pub enum SubmitVia {
    Control { label: String },
    EnterKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Label of the input candidate that received the text.
    pub surface: String,
    #[serde(rename = "submittedVia")]
    pub submitted_via: SubmitVia,
    /// `Some(true)` when the widget took the text (input no longer holds it),
    /// `None` when not checked or the surface could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DeliveryOutcome {
    Delivered(DeliveryReport),
    /// No input surface found; the text is handed back for manual copy.
    Undelivered {
        #[serde(rename = "manualCopy")]
        manual_copy: String,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}
