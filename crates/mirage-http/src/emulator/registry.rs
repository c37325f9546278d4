//! Priority-ordered registry of active predicates and their responses.
//!
//! Both the ordered predicate list and the predicate → response map live
//! behind one mutex, so matching, consuming, registering and resetting are
//! each a single critical section. In particular `resolve` performs match and
//! consume without releasing the lock, which is what guarantees that a
//! SINGLE_USE response is handed out at most once.

use super::types::{EmulatorError, Lifetime, RequestSnapshot, ResponseDefinition};
use crate::predicate::RequestPredicate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Response registered for a predicate, with the latency to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    pub response: ResponseDefinition,
    pub delay: Duration,
}

/// Outcome of a successful match.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub predicate: Arc<RequestPredicate>,
    /// `None` only if the registry lost the response entry for a predicate it
    /// still held.
    pub response: Option<Arc<CannedResponse>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Descending priority; newest first among equal priorities.
    ordered: Vec<Arc<RequestPredicate>>,
    responses: HashMap<Arc<RequestPredicate>, Arc<CannedResponse>>,
}

impl RegistryState {
    fn insert(&mut self, predicate: Arc<RequestPredicate>, response: Arc<CannedResponse>) {
        if let Some(existing) = self.responses.get_mut(&predicate) {
            debug!("Replacing response for existing predicate [{}]", predicate);
            *existing = response;
            return;
        }
        let position = self
            .ordered
            .iter()
            .position(|p| p.priority() <= predicate.priority())
            .unwrap_or(self.ordered.len());
        self.ordered.insert(position, Arc::clone(&predicate));
        self.responses.insert(predicate, response);
    }

    fn find_match(
        &self,
        snapshot: &RequestSnapshot,
    ) -> Result<Arc<RequestPredicate>, EmulatorError> {
        self.ordered
            .iter()
            .find(|p| p.test(snapshot))
            .cloned()
            .ok_or_else(|| EmulatorError::NoMatchingRule(Box::new(snapshot.clone())))
    }

    fn consume(&mut self, predicate: &RequestPredicate) -> Option<Arc<CannedResponse>> {
        if predicate.lifetime() == Lifetime::SingleUse {
            debug!("Consuming single use response for predicate [{}]", predicate);
            self.ordered.retain(|p| p.as_ref() != predicate);
            self.responses.remove(predicate)
        } else {
            debug!(
                "Serving {} response for predicate [{}]",
                predicate.lifetime().as_str(),
                predicate
            );
            self.responses.get(predicate).cloned()
        }
    }

    fn remove_transient(&mut self) -> usize {
        let before = self.ordered.len();
        let responses = &mut self.responses;
        self.ordered.retain(|p| {
            let keep = p.lifetime() == Lifetime::Forever;
            if !keep {
                responses.remove(p);
            }
            keep
        });
        before - self.ordered.len()
    }
}

/// Thread-safe registry exposing only atomic operations.
#[derive(Debug, Default)]
pub struct ResponseRegistry {
    state: Mutex<RegistryState>,
}

impl ResponseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a predicate and its response.
    ///
    /// A predicate structurally equal to one already registered keeps its
    /// position and has its response replaced.
    pub fn register(&self, predicate: RequestPredicate, response: CannedResponse) {
        self.state
            .lock()
            .insert(Arc::new(predicate), Arc::new(response));
    }

    /// Highest-priority predicate accepting the snapshot, without consuming it.
    pub fn find_match(
        &self,
        snapshot: &RequestSnapshot,
    ) -> Result<Arc<RequestPredicate>, EmulatorError> {
        self.state.lock().find_match(snapshot)
    }

    /// Response for a predicate; removes it when the predicate is SINGLE_USE.
    pub fn consume(
        &self,
        predicate: &RequestPredicate,
    ) -> Result<Arc<CannedResponse>, EmulatorError> {
        self.state
            .lock()
            .consume(predicate)
            .ok_or_else(|| EmulatorError::InconsistentRegistry(predicate.to_string()))
    }

    /// Match and consume as one atomic step.
    pub fn resolve(&self, snapshot: &RequestSnapshot) -> Result<Resolution, EmulatorError> {
        let mut state = self.state.lock();
        let predicate = state.find_match(snapshot)?;
        let response = state.consume(&predicate);
        Ok(Resolution {
            predicate,
            response,
        })
    }

    /// Remove every predicate whose lifetime is not FOREVER; returns how many.
    pub fn reset(&self) -> usize {
        self.state.lock().remove_transient()
    }

    /// Number of active predicates.
    pub fn len(&self) -> usize {
        self.state.lock().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
