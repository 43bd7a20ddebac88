//! # Payment Status Mapping & Transitions
//!
//! The pure half of payment reconciliation: translate the gateway's status
//! vocabulary into our [`PaymentStatus`] and decide, for a (current,
//! incoming) pair, what the next status is and which side effects must run.
//!
//! ## Why a Transition Function?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Three Triggers, One Decision                           │
//! │                                                                         │
//! │   Webhook push ─────────┐                                              │
//! │                         │                                              │
//! │   Status check ─────────┼──► map_gateway_status(raw)                   │
//! │   (user-initiated)      │         │                                    │
//! │                         │         ▼                                    │
//! │   Manual re-sync ───────┘    transition(current, incoming)             │
//! │                                   │                                    │
//! │                                   ▼                                    │
//! │              Some(Transition { next, effects }) or None                │
//! │                                   │                                    │
//! │                                   ▼                                    │
//! │    apps/server applies `next` via an atomic conditional UPDATE         │
//! │    and runs `effects` only if exactly one row changed.                 │
//! │                                                                         │
//! │  Every trigger reaches the same end state for the same gateway         │
//! │  status, and the PAID side effects (stock decrement, notification)     │
//! │  run AT MOST ONCE even when triggers race.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is deliberately free of I/O: the conditional UPDATE that
//! makes the transition atomic lives in kasa-db, and the services layer
//! wires the two together.

use crate::types::PaymentStatus;
use crate::EXTERNAL_REF_PREFIX;

// =============================================================================
// Gateway Status Mapping
// =============================================================================

/// Maps the gateway's status vocabulary onto [`PaymentStatus`].
///
/// ## Mapping
/// | Gateway says                | We store |
/// |-----------------------------|----------|
/// | PAID, SETTLED, SUCCEEDED    | Paid     |
/// | FAILED                      | Failed   |
/// | EXPIRED                     | Expired  |
/// | anything else               | Pending  |
///
/// Comparison is case-insensitive; unknown vocabulary degrades to Pending
/// rather than erroring, so a gateway adding new intermediate states never
/// breaks webhook acknowledgment.
pub fn map_gateway_status(raw: &str) -> PaymentStatus {
    match raw.trim().to_ascii_uppercase().as_str() {
        "PAID" | "SETTLED" | "SUCCEEDED" => PaymentStatus::Paid,
        "FAILED" => PaymentStatus::Failed,
        "EXPIRED" => PaymentStatus::Expired,
        _ => PaymentStatus::Pending,
    }
}

// =============================================================================
// External Reference Parsing
// =============================================================================

/// Extracts the local transaction id from a gateway external id.
///
/// Invoices are created with `external_id = "pos-{transaction_id}"`.
/// Returns `None` when the prefix is absent; callers then fall back to
/// matching the external id verbatim against the stored gateway invoice id.
pub fn parse_external_ref(external_id: &str) -> Option<&str> {
    external_id
        .strip_prefix(EXTERNAL_REF_PREFIX)
        .filter(|rest| !rest.is_empty())
}

// =============================================================================
// Transition Function
// =============================================================================

/// A side effect owed after a status transition commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Decrement each line item's product stock and append SALE logs
    /// (plus low-stock notifications where the threshold is crossed).
    DecrementStock,
    /// Emit a "payment received" notification.
    NotifyPaid,
    /// Emit a "payment failed" notification.
    NotifyFailed,
}

/// The outcome of a reconciliation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Status to write.
    pub next: PaymentStatus,
    /// Side effects to run, in order, after the status write succeeds.
    pub effects: Vec<SideEffect>,
}

/// Decides what a reconciliation trigger should do.
///
/// Returns `None` when nothing must change: the trigger is an idempotent
/// re-entry (already at `incoming`), the transaction is already in a
/// terminal state, or the gateway reported something that maps to Pending.
///
/// ## Truth Table
/// ```text
/// current   incoming   result
/// ───────   ────────   ─────────────────────────────────────────────
/// Pending   Paid       Paid    + [DecrementStock, NotifyPaid]
/// Pending   Failed     Failed  + [NotifyFailed]
/// Pending   Expired    Expired + []
/// Pending   Pending    None (no news)
/// Paid      *          None (terminal; duplicate triggers are no-ops)
/// Failed    *          None (terminal)
/// Expired   *          None (terminal)
/// ```
///
/// Terminal states never transition. In particular a late PAID webhook for
/// an EXPIRED invoice is ignored here; the store reconciles such cases
/// manually against the gateway dashboard.
pub fn transition(current: PaymentStatus, incoming: PaymentStatus) -> Option<Transition> {
    if current.is_terminal() || incoming == current {
        return None;
    }

    match incoming {
        PaymentStatus::Paid => Some(Transition {
            next: PaymentStatus::Paid,
            effects: vec![SideEffect::DecrementStock, SideEffect::NotifyPaid],
        }),
        PaymentStatus::Failed => Some(Transition {
            next: PaymentStatus::Failed,
            effects: vec![SideEffect::NotifyFailed],
        }),
        PaymentStatus::Expired => Some(Transition {
            next: PaymentStatus::Expired,
            effects: vec![],
        }),
        PaymentStatus::Pending => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_gateway_status_paid_vocabulary() {
        assert_eq!(map_gateway_status("PAID"), PaymentStatus::Paid);
        assert_eq!(map_gateway_status("SETTLED"), PaymentStatus::Paid);
        assert_eq!(map_gateway_status("SUCCEEDED"), PaymentStatus::Paid);
        // Case-insensitive
        assert_eq!(map_gateway_status("paid"), PaymentStatus::Paid);
        assert_eq!(map_gateway_status(" Settled "), PaymentStatus::Paid);
    }

    #[test]
    fn test_map_gateway_status_failure_vocabulary() {
        assert_eq!(map_gateway_status("FAILED"), PaymentStatus::Failed);
        assert_eq!(map_gateway_status("EXPIRED"), PaymentStatus::Expired);
    }

    #[test]
    fn test_map_gateway_status_unknown_is_pending() {
        assert_eq!(map_gateway_status("PENDING"), PaymentStatus::Pending);
        assert_eq!(map_gateway_status("AWAITING_CAPTURE"), PaymentStatus::Pending);
        assert_eq!(map_gateway_status(""), PaymentStatus::Pending);
    }

    #[test]
    fn test_parse_external_ref() {
        assert_eq!(parse_external_ref("pos-abc-123"), Some("abc-123"));
        assert_eq!(parse_external_ref("pos-"), None);
        assert_eq!(parse_external_ref("inv-abc-123"), None);
        assert_eq!(parse_external_ref("abc-123"), None);
    }

    #[test]
    fn test_transition_pending_to_paid() {
        let t = transition(PaymentStatus::Pending, PaymentStatus::Paid).unwrap();
        assert_eq!(t.next, PaymentStatus::Paid);
        assert_eq!(
            t.effects,
            vec![SideEffect::DecrementStock, SideEffect::NotifyPaid]
        );
    }

    #[test]
    fn test_transition_pending_to_failed() {
        let t = transition(PaymentStatus::Pending, PaymentStatus::Failed).unwrap();
        assert_eq!(t.next, PaymentStatus::Failed);
        assert_eq!(t.effects, vec![SideEffect::NotifyFailed]);
    }

    #[test]
    fn test_transition_pending_to_expired_has_no_effects() {
        let t = transition(PaymentStatus::Pending, PaymentStatus::Expired).unwrap();
        assert_eq!(t.next, PaymentStatus::Expired);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_transition_idempotent_reentry() {
        // Already paid: any further trigger is a no-op
        assert!(transition(PaymentStatus::Paid, PaymentStatus::Paid).is_none());
        assert!(transition(PaymentStatus::Paid, PaymentStatus::Failed).is_none());
        assert!(transition(PaymentStatus::Paid, PaymentStatus::Expired).is_none());
    }

    #[test]
    fn test_transition_terminal_states_never_move() {
        assert!(transition(PaymentStatus::Failed, PaymentStatus::Paid).is_none());
        assert!(transition(PaymentStatus::Expired, PaymentStatus::Paid).is_none());
    }

    #[test]
    fn test_transition_no_news_is_noop() {
        assert!(transition(PaymentStatus::Pending, PaymentStatus::Pending).is_none());
    }
}
