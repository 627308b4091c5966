//! State change detection between the committed and freshly computed bay states.
//!
//! Only transitions produce actuation:
//!
//! - false → true: [`Action::Wake`]
//! - true → false: [`Action::Sleep`]
//! - true → true: nothing, or [`Action::Rewake`] when redundant wake is on
//!
//! A bay missing from the committed state counts as inactive, so the first
//! cycle after startup wakes every active bay and never sends a sleep.

use crate::bays::BayState;
use crate::device::Action;

/// One bay that needs actuation this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub reference: String,
    pub from: bool,
    pub to: bool,
    pub action: Action,
}

/// Determine which bays need actuation.
///
/// Bays present in `previous` but absent from `computed` have left the
/// directory and are no longer under control; they get no action.
pub fn diff_states(previous: &BayState, computed: &BayState, redundant_wake: bool) -> Vec<Transition> {
    computed
        .iter()
        .filter_map(|(reference, &to)| {
            let from = previous.get(reference).copied().unwrap_or(false);
            let action = match (from, to) {
                (false, true) => Action::Wake,
                (true, false) => Action::Sleep,
                (true, true) if redundant_wake => Action::Rewake,
                _ => return None,
            };
            Some(Transition {
                reference: reference.clone(),
                from,
                to,
                action,
            })
        })
        .collect()
}

/// Log the committed and computed states plus the transitions between them.
pub fn log_state_change(previous: &BayState, computed: &BayState, transitions: &[Transition]) {
    let active = computed.values().filter(|&&on| on).count();
    log_decorated!(
        "Bay states: {} active, {} inactive",
        active,
        computed.len() - active
    );

    if transitions.is_empty() {
        log_indented!("No changes");
        return;
    }

    for transition in transitions {
        let before = if previous.contains_key(&transition.reference) {
            transition.from.to_string()
        } else {
            "unknown".to_string()
        };
        log_indented!(
            "{} {} → {} ({})",
            transition.reference,
            before,
            transition.to,
            transition.action
        );
    }
}
