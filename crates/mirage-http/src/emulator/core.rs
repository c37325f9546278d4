//! The `Emulator`: match-and-respond engine.
//!
//! Composes the predicate builder, the response registry and the request
//! history. Registration, reset and history lookups are synchronous; serving
//! is async because a matched rule may carry a delay.

use super::history::{RequestHistoryStore, DEFAULT_HISTORY_CAPACITY};
use super::registry::{CannedResponse, ResponseRegistry};
use super::types::{EmulatorError, RequestSnapshot, ResponseDefinition, ResponseRule};
use crate::metrics;
use crate::predicate::build_predicate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Shared emulator state; wrap in an `Arc` to serve from many tasks.
#[derive(Debug)]
pub struct Emulator {
    registry: ResponseRegistry,
    history: RequestHistoryStore,
    shutdown_tx: broadcast::Sender<()>,
    shutting_down: AtomicBool,
}

impl Emulator {
    /// Create an emulator keeping `history_capacity` requests per type.
    pub fn new(history_capacity: usize) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry: ResponseRegistry::new(),
            history: RequestHistoryStore::new(history_capacity),
            shutdown_tx,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Compile and install a response rule.
    ///
    /// Either the predicate and its response are both installed or nothing is.
    pub fn register(&self, rule: ResponseRule) -> Result<(), EmulatorError> {
        let time_to_live = rule.time_to_live.as_str();
        let predicate = match build_predicate(&rule) {
            Ok(predicate) => predicate,
            Err(e) => {
                warn!("Rejected response rule: {}", e);
                metrics::record_registration(time_to_live, false);
                return Err(e);
            }
        };

        info!(
            "Registering {} response for request type [{}] with priority {}",
            time_to_live,
            predicate.request_type(),
            predicate.priority()
        );

        let delay = rule.delay_duration();
        self.registry.register(
            predicate,
            CannedResponse {
                response: rule.response,
                delay,
            },
        );

        metrics::record_registration(time_to_live, true);
        metrics::set_active_rules(self.registry.len());
        Ok(())
    }

    /// Answer an application request from the registered rules.
    ///
    /// The request is recorded under the matched predicate's request type
    /// before any delay is applied. Unmatched requests are not recorded.
    pub async fn serve(
        &self,
        snapshot: RequestSnapshot,
    ) -> Result<ResponseDefinition, EmulatorError> {
        let resolution = match self.registry.resolve(&snapshot) {
            Ok(resolution) => resolution,
            Err(e) => {
                if matches!(e, EmulatorError::NoMatchingRule(_)) {
                    metrics::record_unmatched(&snapshot.method);
                }
                warn!("{}", e);
                return Err(e);
            }
        };

        let predicate = resolution.predicate;
        let request_type = predicate.request_type();
        self.history.record(request_type, snapshot);
        metrics::set_active_rules(self.registry.len());

        let canned = resolution
            .response
            .ok_or_else(|| EmulatorError::InconsistentRegistry(predicate.to_string()))?;

        if !canned.delay.is_zero() {
            self.wait(canned.delay).await?;
            metrics::record_delay(request_type, duration_millis(canned.delay));
        }

        metrics::record_served(request_type, canned.response.status_code);
        Ok(canned.response.clone())
    }

    /// Drop every non-FOREVER rule and all recorded requests.
    pub fn reset(&self) {
        let removed = self.registry.reset();
        self.history.clear();
        info!("Emulator reset, removed {} rules", removed);
        metrics::record_reset();
        metrics::set_active_rules(self.registry.len());
    }

    /// Remove and return the most recent request recorded for a type.
    pub fn last_request(&self, request_type: &str) -> Option<RequestSnapshot> {
        let last = self.history.take_last(request_type);
        metrics::record_history_lookup(last.is_some());
        last
    }

    /// Number of rules currently registered.
    pub fn active_rules(&self) -> usize {
        self.registry.len()
    }

    /// Signal the server loop and any in-flight delays to stop.
    pub fn shutdown(&self) {
        info!("Emulator shutting down");
        self.shutting_down.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    async fn wait(&self, delay: Duration) -> Result<(), EmulatorError> {
        let millis = duration_millis(delay);
        // Subscribe before checking the flag so a concurrent shutdown is not missed.
        let mut shutdown_rx = self.subscribe_shutdown();
        if self.is_shutting_down() {
            return Err(EmulatorError::DelayInterrupted(millis));
        }

        debug!("Delaying response by {}ms", millis);
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = shutdown_rx.recv() => Err(EmulatorError::DelayInterrupted(millis)),
        }
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
