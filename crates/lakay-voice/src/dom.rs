//! DOM seam — the few operations delivery needs from a rendered page.

use async_trait::async_trait;
use lakay_core::Result;

/// A rendered document that can be searched by CSS selector.
#[async_trait]
pub trait Page: Send + Sync {
    type Element: Element + 'static;

    /// First element matching `selector`, if any.
    async fn query(&self, selector: &str) -> Result<Option<Self::Element>>;
}

/// Handle to one element of a [`Page`].
#[async_trait]
pub trait Element: Send + Sync {
    /// Whether the element is still attached to the document.
    async fn is_connected(&self) -> Result<bool>;

    async fn value(&self) -> Result<String>;

    async fn set_value(&self, value: &str) -> Result<()>;

    async fn dispatch(&self, event: DomEvent) -> Result<()>;

    async fn focus(&self) -> Result<()>;

    async fn click(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Press,
    Up,
}

/// Events delivery fires on the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEvent {
    Input,
    Change,
    /// Plain `keyup` with no key attached.
    KeyUp,
    Key { phase: KeyPhase, key: &'static str },
}

impl DomEvent {
    /// Fired after setting the value, in this order.
    pub const LIFECYCLE: [DomEvent; 3] = [DomEvent::Input, DomEvent::Change, DomEvent::KeyUp];

    /// Synthetic Enter press used when no send control is found.
    pub const ENTER: [DomEvent; 3] = [
        DomEvent::Key {
            phase: KeyPhase::Down,
            key: "Enter",
        },
        DomEvent::Key {
            phase: KeyPhase::Press,
            key: "Enter",
        },
        DomEvent::Key {
            phase: KeyPhase::Up,
            key: "Enter",
        },
    ];

    /// DOM event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
            Self::KeyUp => "keyup",
            Self::Key { phase, .. } => match phase {
                KeyPhase::Down => "keydown",
                KeyPhase::Press => "keypress",
                KeyPhase::Up => "keyup",
            },
        }
    }

    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Key { key, .. } => Some(key),
            _ => None,
        }
    }
}
