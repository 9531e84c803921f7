//! Block detection
//!
//! Decides whether a probe failure means the node is blocked at the
//! transport level. Only a network-operation error that carries a resolved
//! target address counts. Everything else (unresolved targets, a missing
//! cached address, unrecognized failures) is logged and treated as not
//! blocked, so remediation never starts on an ambiguous signal.

use tracing::{debug, warn};

use crate::probe::ProbeError;

/// Classify a probe outcome
///
/// `None` means the probe succeeded.
pub fn is_blocked(error: Option<&ProbeError>) -> bool {
    match error {
        None => false,
        Some(ProbeError::Net(op)) if op.addr.is_some() => true,
        Some(ProbeError::Net(op)) => {
            debug!("network error without a target address, not blocked: {}", op);
            false
        }
        Some(other) => {
            warn!("unclassified probe failure, not blocked: {}", other);
            false
        }
    }
}
