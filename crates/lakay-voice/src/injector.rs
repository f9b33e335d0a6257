//! Transcript injector — locate, fill, then submit.

use std::future::Future;
use std::sync::Arc;

use lakay_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::config::InjectorConfig;
use crate::dom::{DomEvent, Element, Page};
use crate::types::{Candidate, DeliveryOutcome, DeliveryReport, SubmitVia};

/// Delivers recognized text into a chat widget and triggers its send path.
///
/// No deduplication: the same text delivered twice is sent twice. Once a
/// delivery starts it runs to completion against whatever the page looks
/// like when each phase fires, even if the caller stops waiting for it.
pub struct TranscriptInjector<P: Page> {
    page: Arc<P>,
    config: InjectorConfig,
}

impl<P: Page> Clone for TranscriptInjector<P> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: Page + 'static> TranscriptInjector<P> {
    pub fn new(page: Arc<P>, config: InjectorConfig) -> Self {
        Self { page, config }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    pub fn page(&self) -> &Arc<P> {
        &self.page
    }

    /// Put `text` into the widget and submit it.
    ///
    /// Returns [`DeliveryOutcome::Undelivered`] with the raw text when no input
    /// surface can be found. Errors only come from the page transport after a
    /// surface was found.
    pub async fn deliver(&self, text: &str) -> Result<DeliveryOutcome> {
        let this = self.clone();
        let text = text.to_string();
        detached(async move { this.run_delivery(&text).await }).await
    }

    /// Fill the input without submitting. Returns whether a surface was found.
    pub async fn prefill(&self, text: &str) -> Result<bool> {
        let this = self.clone();
        let text = text.to_string();
        detached(async move { this.run_prefill(&text).await }).await
    }

    async fn run_delivery(&self, text: &str) -> Result<DeliveryOutcome> {
        tokio::time::sleep(self.config.settle_delay()).await;

        // Phase 1: locate & fill
        let Some((surface_label, surface)) = self.locate(&self.config.input_candidates).await
        else {
            warn!("No input surface found, handing transcript back for manual copy");
            return Ok(DeliveryOutcome::Undelivered {
                manual_copy: text.to_string(),
            });
        };

        info!(surface = %surface_label, chars = text.chars().count(), "Delivering transcript");
        surface.set_value(text).await?;
        for event in DomEvent::LIFECYCLE {
            surface.dispatch(event).await?;
        }
        surface.focus().await?;

        // Phase 2: submit
        tokio::time::sleep(self.config.submit_delay()).await;
        let submitted_via = self.submit(&surface).await?;

        let confirmed = match self.config.confirm_delay() {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                match surface.value().await {
                    Ok(value) => Some(value != text),
                    Err(e) => {
                        debug!("Could not read surface after submit: {}", e);
                        None
                    }
                }
            }
            None => None,
        };
        if confirmed == Some(false) {
            warn!(surface = %surface_label, "Widget did not take the transcript");
        }

        Ok(DeliveryOutcome::Delivered(DeliveryReport {
            surface: surface_label,
            submitted_via,
            confirmed,
        }))
    }

    async fn run_prefill(&self, text: &str) -> Result<bool> {
        tokio::time::sleep(self.config.settle_delay()).await;

        let Some((label, surface)) = self.locate(&self.config.input_candidates).await else {
            warn!("No input surface found for prefill");
            return Ok(false);
        };
        debug!(surface = %label, "Prefilling input");
        surface.set_value(text).await?;
        surface.dispatch(DomEvent::Input).await?;
        surface.focus().await?;
        Ok(true)
    }

    async fn submit(&self, surface: &P::Element) -> Result<SubmitVia> {
        if let Some((label, control)) = self.locate(&self.config.submit_candidates).await {
            match control.click().await {
                Ok(()) => {
                    info!(control = %label, "Transcript submitted");
                    return Ok(SubmitVia::Control { label });
                }
                Err(e) => warn!(control = %label, "Send control click failed: {}", e),
            }
        }

        info!("No send control, pressing Enter on the input");
        for event in DomEvent::ENTER {
            surface.dispatch(event).await?;
        }
        Ok(SubmitVia::EnterKey)
    }

    /// First candidate resolving to an attached element, in order.
    async fn locate(&self, candidates: &[Candidate]) -> Option<(String, P::Element)> {
        for candidate in candidates {
            let element = match self.page.query(&candidate.selector).await {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(e) => {
                    warn!(candidate = %candidate.label, "Selector query failed: {}", e);
                    continue;
                }
            };
            match element.is_connected().await {
                Ok(true) => {
                    debug!(candidate = %candidate.label, "Matched {}", candidate.selector);
                    return Some((candidate.label.clone(), element));
                }
                Ok(false) => continue,
                Err(e) => warn!(candidate = %candidate.label, "Connection check failed: {}", e),
            }
        }
        None
    }
}

/// Run `work` on its own task so dropping the caller does not stop it halfway.
async fn detached<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| Error::Internal(format!("delivery task: {}", e)))?
}
