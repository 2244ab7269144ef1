//! Throttle decision for a login attempt
//!
//! Given how many failures an origin produced inside the window, decide
//! whether the attempt proceeds, proceeds behind a challenge, or is refused
//! before any credential is looked at.

use crate::config::SecurityPolicy;
use serde::{Deserialize, Serialize};

/// Outcome of the throttle check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrottleDecision {
    /// Proceed to credential verification
    Allow,

    /// Proceed, but the caller must have passed human verification
    Challenge,

    /// Refuse without checking credentials
    Reject { challenge_required: bool },
}

impl ThrottleDecision {
    /// Challenge context carried into any failure reported for this attempt
    pub fn challenge_required(&self) -> bool {
        match self {
            ThrottleDecision::Allow => false,
            ThrottleDecision::Challenge => true,
            ThrottleDecision::Reject { challenge_required } => *challenge_required,
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, ThrottleDecision::Reject { .. })
    }
}

/// Decide the throttle outcome for a failure count.
///
/// The challenge threshold is met at `>=`, the reject threshold only once it
/// is exceeded (`>`), so an origin sitting exactly at the reject limit still
/// gets a challenged attempt before the hard stop.
pub fn evaluate(
    failure_count: u32,
    max_failures_before_reject: u32,
    max_failures_before_challenge: u32,
    challenge_capability_available: bool,
) -> ThrottleDecision {
    let challenge_required = challenge_capability_available
        && max_failures_before_challenge > 0
        && failure_count >= max_failures_before_challenge;

    if max_failures_before_reject > 0 && failure_count > max_failures_before_reject {
        ThrottleDecision::Reject { challenge_required }
    } else if challenge_required {
        ThrottleDecision::Challenge
    } else {
        ThrottleDecision::Allow
    }
}

/// Thresholds bound to a policy snapshot
#[derive(Debug, Clone, Copy)]
pub struct ChallengePolicy {
    policy: SecurityPolicy,
    challenge_capability_available: bool,
}

impl ChallengePolicy {
    pub fn new(policy: SecurityPolicy, challenge_capability_available: bool) -> Self {
        Self {
            policy,
            challenge_capability_available,
        }
    }

    /// Whether failure history has to be read for this policy
    pub fn is_active(&self) -> bool {
        self.policy.throttle_active()
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Decide for a failure count; an inactive policy always allows
    pub fn decide(&self, failure_count: u32) -> ThrottleDecision {
        if !self.is_active() {
            return ThrottleDecision::Allow;
        }

        evaluate(
            failure_count,
            self.policy.max_failures_before_reject,
            self.policy.max_failures_before_challenge,
            self.challenge_capability_available,
        )
    }
}
