//! crates/guardian_core/src/biometric.rs
//!
//! The local re-authentication gate that guards every sensitive reveal or mutation.
//!
//! No platform biometric API is wired in yet; `SimulatedBiometricGate` grants access
//! after a fixed delay. Callers go through `run_gate`, which bounds the wait with a
//! timeout and honours a cancellation signal, so a real implementation that can deny
//! or stall drops in without touching any call site.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ports::BiometricGate;

/// The result of one pass through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Granted,
    Denied,
    TimedOut,
    Cancelled,
}

impl GateOutcome {
    pub fn is_granted(self) -> bool {
        matches!(self, GateOutcome::Granted)
    }
}

/// Stand-in gate: always succeeds after `delay`, unless cancelled first.
#[derive(Debug, Clone)]
pub struct SimulatedBiometricGate {
    delay: Duration,
}

impl SimulatedBiometricGate {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedBiometricGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl BiometricGate for SimulatedBiometricGate {
    async fn authenticate(&self, cancel: CancellationToken) -> GateOutcome {
        tokio::select! {
            _ = cancel.cancelled() => GateOutcome::Cancelled,
            _ = tokio::time::sleep(self.delay) => GateOutcome::Granted,
        }
    }
}

/// Runs `gate` once, giving up after `timeout` or as soon as `cancel` fires.
pub async fn run_gate(
    gate: &dyn BiometricGate,
    timeout: Duration,
    cancel: &CancellationToken,
) -> GateOutcome {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => GateOutcome::Cancelled,
        result = tokio::time::timeout(timeout, gate.authenticate(cancel.child_token())) => {
            result.unwrap_or(GateOutcome::TimedOut)
        }
    };

    match outcome {
        GateOutcome::Granted => info!("Biometric gate granted."),
        other => warn!("Biometric gate did not grant access: {:?}", other),
    }
    outcome
}
