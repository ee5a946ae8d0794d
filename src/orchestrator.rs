//! Slot Query Orchestrator.
//!
//! Given a [`SlotRequest`], the orchestrator sequences the Widget Driver
//! through the booking flow, applies retry-with-backoff on failure, caches
//! unfiltered results per request key, and returns a normalized slot list.
//! It never raises to the caller: exhausted retries yield an empty list.

use crate::booking::{Slot, SlotRequest};
use crate::cache::SlotCache;
use crate::diagnostics::SnapshotSink;
use crate::driver::{WidgetDriver, WidgetSession};
use crate::error::{FlowError, FlowErrorKind, Result};
use crate::flow::{BookingFlow, FlowConfig, FlowStep, WidgetSelectors};
use std::path::PathBuf;
use std::time::Duration;

/// Process-scoped configuration, passed in at construction
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-flow timeouts and bounds
    pub flow: FlowConfig,

    /// Total attempts per resolve, fresh session each
    pub max_attempts: u32,

    /// Base unit of the exponential backoff between attempts
    pub backoff_unit: Duration,

    /// Where diagnostic snapshots are written
    pub snapshot_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            flow: FlowConfig::default(),
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            snapshot_dir: PathBuf::from("screenshots"),
        }
    }
}

/// Resolves slot requests against the booking widget.
///
/// One resolve runs at a time to completion; the cache is the only state
/// shared across calls.
pub struct SlotQueryOrchestrator<D: WidgetDriver> {
    driver: D,
    config: OrchestratorConfig,
    selectors: WidgetSelectors,
    cache: SlotCache,
    sink: SnapshotSink,
}

impl<D: WidgetDriver> SlotQueryOrchestrator<D> {
    pub fn new(driver: D, config: OrchestratorConfig) -> Self {
        Self::with_parts(driver, config, WidgetSelectors::default(), SlotCache::new())
    }

    /// Construct with an explicit selector table and cache instance, so
    /// tests can substitute either
    pub fn with_parts(
        driver: D,
        config: OrchestratorConfig,
        selectors: WidgetSelectors,
        cache: SlotCache,
    ) -> Self {
        let sink = SnapshotSink::new(&config.snapshot_dir);
        Self {
            driver,
            config,
            selectors,
            cache,
            sink,
        }
    }

    pub fn cache(&self) -> &SlotCache {
        &self.cache
    }

    /// Resolve a request to its open slots.
    ///
    /// Never errors: unknown input and exhausted retries both yield an empty
    /// list. A cached result short-circuits all session setup. Only
    /// unfiltered ("all slots") results are cached; a date-filtered resolve
    /// always goes to the widget.
    pub async fn resolve(&self, request: &SlotRequest) -> Vec<Slot> {
        let key = request.cache_key();
        if let Some(slots) = self.cache.get(&key) {
            log::info!("using cached slots for {request}");
            return slots;
        }

        // Caller errors are rejected before any session exists; they would
        // fail identically on every attempt.
        if let Err(err) = self.validate(request) {
            log::error!("rejecting request {request}: {err}");
            return Vec::new();
        }

        for attempt in 0..self.config.max_attempts {
            match self.attempt(request).await {
                Ok(slots) => {
                    if !request.is_filtered() {
                        self.cache.store(key, slots.clone());
                    }
                    return slots;
                }
                Err(err) => {
                    log::error!(
                        "slot query attempt {}/{} failed: {err}",
                        attempt + 1,
                        self.config.max_attempts
                    );
                    if !err.is_retryable() || attempt + 1 == self.config.max_attempts {
                        return Vec::new();
                    }
                    let backoff = self.config.backoff_unit * 2u32.pow(attempt);
                    log::debug!("backing off for {backoff:?}");
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Vec::new()
    }

    fn validate(&self, request: &SlotRequest) -> Result<()> {
        if self.selectors.patient_option(request.patient_type).is_none() {
            return Err(FlowError::new(
                FlowStep::SelectPatientType,
                FlowErrorKind::InvalidInput(format!(
                    "unknown patient type: {:?}",
                    request.patient_type
                )),
            ));
        }
        if self
            .selectors
            .appointment_option(request.appointment_type)
            .is_none()
        {
            return Err(FlowError::new(
                FlowStep::SelectAppointmentType,
                FlowErrorKind::InvalidInput(format!(
                    "unknown appointment type: {:?}",
                    request.appointment_type
                )),
            ));
        }
        Ok(())
    }

    /// One attempt on a fresh session. The session is released on every
    /// path before the result is returned.
    async fn attempt(&self, request: &SlotRequest) -> Result<Vec<Slot>> {
        let mut session = self.driver.open_page().await.map_err(|e| {
            FlowError::new(FlowStep::Navigate, FlowErrorKind::DriverFault(e.to_string()))
        })?;

        let outcome = BookingFlow::new(&mut session, &self.selectors, &self.config.flow, &self.sink)
            .run(request)
            .await;

        if let Err(e) = session.close().await {
            log::warn!("session close failed: {e}");
        }

        outcome
    }
}
