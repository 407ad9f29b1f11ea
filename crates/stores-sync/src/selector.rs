//! # Strategy Selector
//!
//! Decides which data access strategy is live and when to fail over.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   decide_initial(mode, allowed, prior_failures)                        │
//! │        │                                                                │
//! │        ├── Rest(reason) ───────────────────────────────┐               │
//! │        │                                               │               │
//! │        ▼                                               ▼               │
//! │   ┌──────────┐  first snapshot   ┌───────────┐    ┌──────────┐         │
//! │   │ Probing  │──────────────────►│ RealTime  │───►│   Rest   │         │
//! │   └────┬─────┘                   └───────────┘    └──────────┘         │
//! │        │    timeout / error          error or          ▲               │
//! │        └─────────────────────────────N transport ──────┘               │
//! │                                      write errors                      │
//! │                                                                         │
//! │   Rest is terminal for the session: no downgrade back to RealTime.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The selector only decides. The Inventory Store performs the transition
//! (tear down subscriptions, one full REST fetch).

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::access::StrategyKind;
use crate::config::{AccessMode, StoresConfig};
use crate::error::AccessError;

/// Where the selector currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Probing,
    RealTime,
    Rest,
}

impl AccessState {
    /// The strategy serving reads and writes in this state.
    ///
    /// Probing writes go to the real-time strategy; it is the one being tried.
    pub fn strategy(&self) -> StrategyKind {
        match self {
            AccessState::Probing | AccessState::RealTime => StrategyKind::RealTime,
            AccessState::Rest => StrategyKind::Rest,
        }
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessState::Probing => write!(f, "probing"),
            AccessState::RealTime => write!(f, "realtime"),
            AccessState::Rest => write!(f, "rest"),
        }
    }
}

/// Why the REST strategy was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverReason {
    /// Configured mode is `rest`.
    ForcedByConfig,
    /// The environment blocks the real-time transport.
    RealtimeDisallowed,
    /// Earlier sessions failed too often to bother probing.
    PriorFailures { count: u32 },
    /// No first snapshot within the probe window.
    ProbeTimeout,
    /// The real-time strategy reported an error.
    RealtimeError(String),
    /// Consecutive transport errors on real-time writes.
    RepeatedTransportErrors { count: u32 },
}

impl fmt::Display for FailoverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverReason::ForcedByConfig => write!(f, "REST forced by configuration"),
            FailoverReason::RealtimeDisallowed => write!(f, "real-time transport disallowed"),
            FailoverReason::PriorFailures { count } => {
                write!(f, "{} prior real-time failures", count)
            }
            FailoverReason::ProbeTimeout => write!(f, "no real-time snapshot before timeout"),
            FailoverReason::RealtimeError(e) => write!(f, "real-time error: {}", e),
            FailoverReason::RepeatedTransportErrors { count } => {
                write!(f, "{} consecutive transport errors", count)
            }
        }
    }
}

/// Startup decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialDecision {
    Probe,
    Rest(FailoverReason),
}

/// Picks the starting strategy. Pure, so it can be tested without I/O.
///
/// ```text
/// mode=rest                                → Rest(ForcedByConfig)
/// mode=realtime                            → Probe
/// mode=auto, !realtime_allowed             → Rest(RealtimeDisallowed)
/// mode=auto, prior_failures >= threshold   → Rest(PriorFailures)
/// mode=auto, otherwise                     → Probe
/// ```
pub fn decide_initial(
    mode: AccessMode,
    realtime_allowed: bool,
    prior_failures: u32,
    threshold: u32,
) -> InitialDecision {
    match mode {
        AccessMode::Rest => InitialDecision::Rest(FailoverReason::ForcedByConfig),
        AccessMode::Realtime => InitialDecision::Probe,
        AccessMode::Auto if !realtime_allowed => {
            InitialDecision::Rest(FailoverReason::RealtimeDisallowed)
        }
        AccessMode::Auto if threshold > 0 && prior_failures >= threshold => {
            InitialDecision::Rest(FailoverReason::PriorFailures {
                count: prior_failures,
            })
        }
        AccessMode::Auto => InitialDecision::Probe,
    }
}

/// What the caller must do after feeding an event to the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    None,
    EnterRealTime,
    FailOver(FailoverReason),
}

// =============================================================================
// Selector
// =============================================================================

/// Tracks the access state for one session.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    state: AccessState,
    error_threshold: u32,
    consecutive_errors: u32,
    failover_reason: Option<FailoverReason>,
}

impl StrategySelector {
    /// Starts from a decision made by [`decide_initial`].
    pub fn new(decision: InitialDecision, error_threshold: u32) -> Self {
        let (state, failover_reason) = match decision {
            InitialDecision::Probe => (AccessState::Probing, None),
            InitialDecision::Rest(reason) => {
                info!(reason = %reason, "Starting on the REST strategy");
                (AccessState::Rest, Some(reason))
            }
        };
        StrategySelector {
            state,
            error_threshold: error_threshold.max(1),
            consecutive_errors: 0,
            failover_reason,
        }
    }

    pub fn from_config(config: &StoresConfig, prior_failures: u32) -> Self {
        let threshold = config.access.failover_error_threshold;
        let decision = decide_initial(
            config.access.mode,
            config.access.realtime_allowed,
            prior_failures,
            threshold,
        );
        Self::new(decision, threshold)
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn active_strategy(&self) -> StrategyKind {
        self.state.strategy()
    }

    /// Why REST is active, if it is.
    pub fn failover_reason(&self) -> Option<&FailoverReason> {
        self.failover_reason.as_ref()
    }

    /// The real-time strategy delivered its first snapshot.
    pub fn on_first_snapshot(&mut self) -> Transition {
        match self.state {
            AccessState::Probing => {
                info!("First real-time snapshot received");
                self.state = AccessState::RealTime;
                Transition::EnterRealTime
            }
            _ => Transition::None,
        }
    }

    /// The probe window closed without a snapshot.
    pub fn on_probe_timeout(&mut self) -> Transition {
        match self.state {
            AccessState::Probing => self.fail_over(FailoverReason::ProbeTimeout),
            _ => Transition::None,
        }
    }

    /// A real-time subscription reported an error.
    pub fn on_subscription_error(&mut self, error: &AccessError) -> Transition {
        match self.state {
            AccessState::Probing | AccessState::RealTime => {
                self.fail_over(FailoverReason::RealtimeError(error.to_string()))
            }
            AccessState::Rest => Transition::None,
        }
    }

    /// A write through the active strategy failed.
    ///
    /// Only transport failures on the real-time path count; business errors
    /// (not found, validation) say nothing about the transport.
    pub fn on_write_error(&mut self, error: &AccessError) -> Transition {
        if self.state == AccessState::Rest || !error.is_transport() {
            return Transition::None;
        }

        self.consecutive_errors += 1;
        debug!(
            count = self.consecutive_errors,
            threshold = self.error_threshold,
            error = %error,
            "Real-time transport error"
        );

        if self.consecutive_errors >= self.error_threshold {
            let count = self.consecutive_errors;
            self.fail_over(FailoverReason::RepeatedTransportErrors { count })
        } else {
            Transition::None
        }
    }

    /// A write through the active strategy succeeded.
    pub fn on_write_success(&mut self) {
        self.consecutive_errors = 0;
    }

    fn fail_over(&mut self, reason: FailoverReason) -> Transition {
        warn!(from = %self.state, reason = %reason, "Failing over to REST");
        self.state = AccessState::Rest;
        self.consecutive_errors = 0;
        self.failover_reason = Some(reason.clone());
        Transition::FailOver(reason)
    }
}
