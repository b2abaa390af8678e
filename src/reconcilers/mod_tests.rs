// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for reconciler helper functions.

#[cfg(test)]
mod tests {
    use super::super::{status_changed, ReconcileOutcome};
    use std::time::Duration;

    // ========== Tests for status_changed() ==========

    #[test]
    fn test_status_changed_both_none() {
        let current: Option<String> = None;
        let new: Option<String> = None;

        assert!(!status_changed(&current, &new));
    }

    #[test]
    fn test_status_changed_provider_id_appears() {
        // Arrange: server was just created
        let current: Option<String> = None;
        let new = Some("hcloud://4711".to_string());

        // Assert: update needed
        assert!(status_changed(&current, &new));
    }

    #[test]
    fn test_status_changed_provider_id_unchanged() {
        let current = Some("hcloud://4711".to_string());
        let new = Some("hcloud://4711".to_string());

        assert!(
            !status_changed(&current, &new),
            "Re-asserting the same provider ID must not trigger a write"
        );
    }

    #[test]
    fn test_status_changed_values_differ() {
        assert!(status_changed(&Some(1_i64), &Some(2_i64)));
    }

    // ========== Tests for ReconcileOutcome ==========

    #[test]
    fn test_outcome_is_requeue() {
        assert!(ReconcileOutcome::RequeueAfter(Duration::from_secs(5)).is_requeue());
        assert!(!ReconcileOutcome::Done.is_requeue());
    }
}
