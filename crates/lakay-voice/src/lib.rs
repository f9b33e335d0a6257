//! Voice transcript delivery — puts recognized speech into a chat widget we
//! do not own, then asks it to send.
//!
//! The widget's input and send affordances are found through ordered
//! candidate chains (most specific selector first). Delivery runs in two
//! phases separated by settle delays: fill the input and fire its
//! lifecycle events, then click a send control or fall back to Enter.
//! Pages are reached through the [`Page`] trait; [`CdpPage`] drives a
//! real browser tab over the DevTools protocol and [`MemoryPage`] is an
//! in-process stand-in.

pub mod cdp;
pub mod config;
pub mod dom;
pub mod injector;
pub mod memory;
pub mod types;

pub use cdp::CdpPage;
pub use config::InjectorConfig;
pub use dom::{DomEvent, Element, KeyPhase, Page};
pub use injector::TranscriptInjector;
pub use memory::MemoryPage;
pub use types::*;
