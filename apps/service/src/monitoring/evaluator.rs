use super::types::{Evaluation, Outcome};
use crate::models::{CheckRecord, CheckState};

/// Up only when the target answered with one of the expected codes.
pub fn derive_state(outcome: &Outcome, success_codes: &[u16]) -> CheckState {
    match outcome.response_code() {
        Some(code) if success_codes.contains(&code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Decide the check's new state and whether its owner should be alerted.
///
/// A check that has never been probed before only gets its initial state;
/// alerts are reserved for transitions between two evaluations.
pub fn evaluate(check: &CheckRecord, outcome: &Outcome) -> Evaluation {
    let new_state = derive_state(outcome, &check.success_codes);
    let alert_warranted = check.has_been_checked() && new_state != check.state;

    Evaluation { new_state, alert_warranted }
}
