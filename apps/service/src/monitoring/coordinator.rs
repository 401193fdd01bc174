use serde_json::Value;
use tracing::{error, info, warn};

use super::types::{CheckDisposition, Evaluation};
use crate::alerts::AlertTransport;
use crate::models::{CheckRecord, CheckState};
use crate::store::{CHECKS, RecordStore};

const STATE_FIELD: &str = "state";
const LAST_CHECKED_FIELD: &str = "lastChecked";

/// Text sent to a check's owner when its state changes.
pub fn alert_message(check: &CheckRecord, state: CheckState) -> String {
    format!(
        "Alert: Your check for {} {}://{} is currently {}",
        check.http_method.as_str().to_uppercase(),
        check.protocol,
        check.url,
        state
    )
}

/// Persist the evaluated state, then alert the owner if warranted.
///
/// Only `state` and `lastChecked` are written back; every other field of the
/// stored `document` is kept as read. The alert is only attempted once the
/// new state is stored, and a failed delivery leaves the stored state in place.
pub async fn persist_and_alert(
    store: &dyn RecordStore,
    alerts: &dyn AlertTransport,
    check: &CheckRecord,
    mut document: Value,
    evaluation: Evaluation,
    checked_at_ms: i64,
) -> CheckDisposition {
    let Some(fields) = document.as_object_mut() else {
        error!(check_id = %check.id, "Stored check is not a JSON object");
        return CheckDisposition::PersistFailed;
    };
    fields.insert(STATE_FIELD.to_string(), Value::from(evaluation.new_state.to_string()));
    fields.insert(LAST_CHECKED_FIELD.to_string(), Value::from(checked_at_ms));

    if let Err(e) = store.update(CHECKS, &check.id, &document).await {
        error!(check_id = %check.id, error = %e, "Failed to save check update");
        return CheckDisposition::PersistFailed;
    }

    if !evaluation.alert_warranted {
        return CheckDisposition::Recorded;
    }

    let message = alert_message(check, evaluation.new_state);
    match alerts.send(&check.owner_phone, &message).await {
        Ok(()) => {
            info!(check_id = %check.id, state = %evaluation.new_state, "Owner alerted to status change");
            CheckDisposition::Alerted
        }
        Err(e) => {
            warn!(check_id = %check.id, error = %e, "Could not alert owner to status change");
            CheckDisposition::AlertFailed
        }
    }
}
