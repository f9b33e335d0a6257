//! In-process page — a fixed set of elements addressed by exact selector.
//!
//! Behaves like a minimal chat widget: clicking a button sends (and clears)
//! the first non-empty attached input; inputs added with
//! [`MemoryPage::add_input_submitting_on_enter`] also send on Enter keydown.
//! Every event is logged with the element's value at dispatch time.

use std::sync::Arc;

use async_trait::async_trait;
use lakay_core::{Error, Result};
use parking_lot::Mutex;

use crate::dom::{DomEvent, Element, KeyPhase, Page};

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEvent {
    pub selector: String,
    /// Event type; keyboard events carry their key (`keydown:Enter`).
    pub event: String,
    /// Element value when the event fired.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Input { submits_on_enter: bool },
    Button,
}

#[derive(Debug)]
struct ElementState {
    selector: String,
    kind: ElementKind,
    value: String,
    connected: bool,
}

#[derive(Debug, Default)]
struct PageState {
    elements: Vec<ElementState>,
    log: Vec<PageEvent>,
    sent: Vec<String>,
}

impl PageState {
    fn record(&mut self, index: usize, event: String) {
        let element = &self.elements[index];
        self.log.push(PageEvent {
            selector: element.selector.clone(),
            event,
            value: element.value.clone(),
        });
    }

    fn send_from(&mut self, index: usize) {
        let element = &mut self.elements[index];
        if element.value.is_empty() {
            return;
        }
        let text = std::mem::take(&mut element.value);
        self.sent.push(text);
    }

    fn live(&self, index: usize) -> Result<&ElementState> {
        match self.elements.get(index) {
            Some(element) if element.connected => Ok(element),
            _ => Err(Error::Internal(format!("element {} is detached", index))),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryPage {
    state: Arc<Mutex<PageState>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&self, selector: &str) {
        self.push(selector, ElementKind::Input {
            submits_on_enter: false,
        });
    }

    pub fn add_input_submitting_on_enter(&self, selector: &str) {
        self.push(selector, ElementKind::Input {
            submits_on_enter: true,
        });
    }

    pub fn add_button(&self, selector: &str) {
        self.push(selector, ElementKind::Button);
    }

    /// Detach every element matching `selector`, as a re-render would.
    pub fn detach(&self, selector: &str) {
        for element in self.state.lock().elements.iter_mut() {
            if element.selector == selector {
                element.connected = false;
            }
        }
    }

    pub fn log(&self) -> Vec<PageEvent> {
        self.state.lock().log.clone()
    }

    /// Messages the widget sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.state
            .lock()
            .elements
            .iter()
            .find(|e| e.selector == selector && e.connected)
            .map(|e| e.value.clone())
    }

    fn push(&self, selector: &str, kind: ElementKind) {
        self.state.lock().elements.push(ElementState {
            selector: selector.to_string(),
            kind,
            value: String::new(),
            connected: true,
        });
    }
}

#[async_trait]
impl Page for MemoryPage {
    type Element = MemoryElement;

    async fn query(&self, selector: &str) -> Result<Option<MemoryElement>> {
        let state = self.state.lock();
        let index = state
            .elements
            .iter()
            .position(|e| e.selector == selector && e.connected);
        Ok(index.map(|index| MemoryElement {
            state: self.state.clone(),
            index,
        }))
    }
}

pub struct MemoryElement {
    state: Arc<Mutex<PageState>>,
    index: usize,
}

#[async_trait]
impl Element for MemoryElement {
    async fn is_connected(&self) -> Result<bool> {
        Ok(self.state.lock().live(self.index).is_ok())
    }

    async fn value(&self) -> Result<String> {
        Ok(self.state.lock().live(self.index)?.value.clone())
    }

    async fn set_value(&self, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.live(self.index)?;
        state.elements[self.index].value = value.to_string();
        Ok(())
    }

    async fn dispatch(&self, event: DomEvent) -> Result<()> {
        let mut state = self.state.lock();
        let kind = state.live(self.index)?.kind;
        let name = match event.key() {
            Some(key) => format!("{}:{}", event.event_type(), key),
            None => event.event_type().to_string(),
        };
        state.record(self.index, name);

        let enter_down = matches!(
            event,
            DomEvent::Key {
                phase: KeyPhase::Down,
                key: "Enter"
            }
        );
        if enter_down
            && kind
                == (ElementKind::Input {
                    submits_on_enter: true,
                })
        {
            state.send_from(self.index);
        }
        Ok(())
    }

    async fn focus(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.live(self.index)?;
        state.record(self.index, "focus".into());
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.live(self.index)?;
        state.record(self.index, "click".into());
        if state.elements[self.index].kind == ElementKind::Button {
            let source = state.elements.iter().position(|e| {
                e.connected && matches!(e.kind, ElementKind::Input { .. }) && !e.value.is_empty()
            });
            if let Some(source) = source {
                state.send_from(source);
            }
        }
        Ok(())
    }
}
