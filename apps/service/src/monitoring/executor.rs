use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::checker::Checker;
use super::coordinator::persist_and_alert;
use super::evaluator::evaluate;
use super::types::{CheckDisposition, CycleReport};
use super::validation::CheckValidator;
use crate::alerts::AlertTransport;
use crate::config::EngineConfig;
use crate::store::{CHECKS, RecordStore};

/// Monitoring executor - runs check pipelines against the configured
/// store, checker and alert transport.
///
/// A check id is claimed for the duration of its pipeline. When cycles
/// overlap, a check still being processed by an earlier cycle is skipped
/// instead of probed twice.
pub struct MonitoringExecutor {
    store: Arc<dyn RecordStore>,
    alerts: Arc<dyn AlertTransport>,
    checker: Arc<dyn Checker>,
    validator: CheckValidator,
    limiter: Option<Semaphore>,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases a claimed check id when dropped.
struct InFlight<'a> {
    ids: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.remove(&self.id);
        }
    }
}

impl MonitoringExecutor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        alerts: Arc<dyn AlertTransport>,
        checker: Arc<dyn Checker>,
        config: &EngineConfig,
    ) -> Self {
        let limiter = (config.max_concurrent_checks > 0)
            .then(|| Semaphore::new(config.max_concurrent_checks));

        Self {
            store,
            alerts,
            checker,
            validator: CheckValidator::new(config.max_timeout_seconds),
            limiter,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, id: &str) -> Option<InFlight<'_>> {
        let mut ids = self.in_flight.lock().ok()?;
        ids.insert(id.to_string()).then(|| InFlight { ids: &self.in_flight, id: id.to_string() })
    }

    /// Run one cycle: list every check and process them concurrently.
    ///
    /// Waits for this cycle's pipelines only; other cycles are unaffected.
    pub async fn run_cycle(self: Arc<Self>) -> CycleReport {
        let ids = match self.store.list(CHECKS).await {
            Ok(ids) if !ids.is_empty() => ids,
            Ok(_) => {
                warn!("Could not find any checks to process");
                return CycleReport::default();
            }
            Err(e) => {
                error!(error = %e, "Failed to list checks");
                return CycleReport { listing_failed: true, ..CycleReport::default() };
            }
        };

        let mut report = CycleReport { listed: ids.len(), ..CycleReport::default() };
        let mut pipelines = JoinSet::new();
        for id in ids {
            let executor = Arc::clone(&self);
            pipelines.spawn(async move { executor.process_check(&id).await });
        }

        while let Some(joined) = pipelines.join_next().await {
            match joined {
                Ok(disposition) => report.record(disposition),
                Err(e) => {
                    error!(error = %e, "Check pipeline aborted");
                    report.aborted += 1;
                }
            }
        }

        info!(%report, "Cycle finished");
        report
    }

    /// Read, validate, probe, evaluate and persist a single check.
    pub async fn process_check(&self, id: &str) -> CheckDisposition {
        let Some(_claim) = self.claim(id) else {
            debug!(check_id = id, "Check still in flight from an earlier cycle, skipping");
            return CheckDisposition::SkippedInFlight;
        };
        let _permit = match &self.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        let raw = match self.store.read(CHECKS, id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(check_id = id, error = %e, "Error reading check data, skipping");
                return CheckDisposition::ReadFailed;
            }
        };

        let check = match self.validator.validate(&raw) {
            Ok(check) => check,
            Err(e) => {
                warn!(check_id = id, error = %e, "Check is not properly formatted, skipping");
                return CheckDisposition::Rejected;
            }
        };
        if check.id != id {
            warn!(check_id = id, stored_id = %check.id, "Check id does not match its key, skipping");
            return CheckDisposition::Rejected;
        }

        let outcome = self.checker.probe(&check).await;
        let evaluation = evaluate(&check, &outcome);
        debug!(
            check_id = id,
            %outcome,
            previous = %check.state,
            state = %evaluation.new_state,
            alert = evaluation.alert_warranted,
            "Check evaluated"
        );

        persist_and_alert(
            self.store.as_ref(),
            self.alerts.as_ref(),
            &check,
            raw,
            evaluation,
            Utc::now().timestamp_millis(),
        )
        .await
    }
}
