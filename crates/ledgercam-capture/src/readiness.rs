// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vision engine readiness.
//
// The engine may need time to initialise. Its owner holds a
// `ReadinessSignal` and calls `mark_ready` once; detection waits on a
// `ReadinessGate`. Readiness is one-way: once ready, always ready.

use std::time::Duration;

use ledgercam_core::error::{LedgercamError, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Result of waiting on a [`ReadinessGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The wait expired first. Capture still works, without detection.
    TimedOut,
    /// The signal was dropped without ever becoming ready.
    Abandoned,
}

impl Readiness {
    /// `Ok` when ready; otherwise the error explaining why detection is off.
    pub fn into_result(self, waited: Duration) -> Result<()> {
        match self {
            Self::Ready => Ok(()),
            Self::TimedOut => Err(LedgercamError::EngineTimeout {
                waited_ms: waited.as_millis() as u64,
            }),
            Self::Abandoned => Err(LedgercamError::Bridge(
                "vision engine stopped before it was ready".into(),
            )),
        }
    }
}

/// Write side, held by whoever initialises the engine.
#[derive(Debug)]
pub struct ReadinessSignal {
    tx: watch::Sender<bool>,
}

/// Read side, cloned into anything that must wait for the engine.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    rx: watch::Receiver<bool>,
}

/// A linked signal/gate pair, initially not ready.
pub fn readiness() -> (ReadinessSignal, ReadinessGate) {
    let (tx, rx) = watch::channel(false);
    (ReadinessSignal { tx }, ReadinessGate { rx })
}

impl ReadinessSignal {
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
        debug!("Vision engine ready");
    }
}

impl ReadinessGate {
    /// A gate that is already open, for engines with no async start-up.
    pub fn ready() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { rx }
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until ready, for at most `timeout`.
    pub async fn wait(&mut self, timeout: Duration) -> Readiness {
        if self.is_ready() {
            return Readiness::Ready;
        }
        match tokio::time::timeout(timeout, self.rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Readiness::Ready,
            Ok(Err(_)) => {
                warn!("Vision engine readiness signal dropped before becoming ready");
                Readiness::Abandoned
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Vision engine not ready in time");
                Readiness::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_gate_is_immediately_open() {
        let mut gate = ReadinessGate::ready();
        assert!(gate.is_ready());
        assert_eq!(gate.wait(Duration::from_millis(1)).await, Readiness::Ready);
    }

    #[tokio::test]
    async fn waits_for_signal() {
        let (signal, mut gate) = readiness();
        assert!(!gate.is_ready());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal.mark_ready();
            // Keep the sender alive until the gate has observed it.
            tokio::time::sleep(Duration::from_millis(50)).await;
        });
        assert_eq!(gate.wait(Duration::from_secs(5)).await, Readiness::Ready);
    }

    #[tokio::test]
    async fn times_out_without_signal() {
        let (_signal, mut gate) = readiness();
        assert_eq!(gate.wait(Duration::from_millis(20)).await, Readiness::TimedOut);
    }

    #[tokio::test]
    async fn dropped_signal_is_abandoned() {
        let (signal, mut gate) = readiness();
        drop(signal);
        assert_eq!(gate.wait(Duration::from_secs(1)).await, Readiness::Abandoned);
    }

    #[tokio::test]
    async fn unready_outcomes_map_to_recoverable_errors() {
        let (_signal, mut gate) = readiness();
        let timeout = Duration::from_millis(20);
        let err = gate.wait(timeout).await.into_result(timeout).unwrap_err();
        assert!(matches!(err, LedgercamError::EngineTimeout { waited_ms: 20 }));
        assert!(!err.is_fatal());

        let err = Readiness::Abandoned.into_result(timeout).unwrap_err();
        assert!(matches!(err, LedgercamError::Bridge(_)));
        assert!(Readiness::Ready.into_result(timeout).is_ok());
    }
}
