// src/loader/staleness.rs

/// Decide whether a provider is due for a refresh.
/// - Never loaded → due.
/// - Loaded, no update cycle → never due again.
/// - Otherwise due once elapsed time strictly exceeds the cycle.
pub fn should_update(
    last_updated: Option<u64>,
    update_cycle_in_ms: Option<u64>,
    now: u64,
) -> bool {
    match (last_updated, update_cycle_in_ms) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(last), Some(cycle)) => now.saturating_sub(last) > cycle,
    }
}
