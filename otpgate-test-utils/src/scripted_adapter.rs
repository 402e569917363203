//! A scripted [`UpstreamBehavior`] for driving `mock-upstream` deterministically in tests.

use std::sync::Mutex;

use otpgate_service::sender_adapter::mock_upstream::{
    CheckVerificationOutcome, StartVerificationOutcome, UpstreamBehavior,
};

/// A scripted behavior that replays a fixed queue of `start_verification` outcomes and always
/// checks against one fixed code.
///
/// Each call to `start_verification` pops the next scripted outcome; once the queue is
/// exhausted it falls back to [`StartVerificationOutcome::Accepted`], so a test only needs to
/// script the attempts it cares about.
pub struct ScriptedBehavior {
    start_outcomes: Mutex<Vec<StartVerificationOutcome>>,
    expected_code: String,
}

impl ScriptedBehavior {
    /// Builds a behavior that accepts every `start_verification` call and matches
    /// `expected_code` on `check_verification`.
    pub fn accepting(expected_code: impl Into<String>) -> Self {
        Self {
            start_outcomes: Mutex::new(Vec::new()),
            expected_code: expected_code.into(),
        }
    }

    /// Builds a behavior that replays `start_outcomes` in order, one per `start_verification`
    /// call, and matches `expected_code` on `check_verification`.
    pub fn scripted(
        start_outcomes: impl IntoIterator<Item = StartVerificationOutcome>,
        expected_code: impl Into<String>,
    ) -> Self {
        let mut start_outcomes: Vec<_> = start_outcomes.into_iter().collect();
        start_outcomes.reverse();
        Self {
            start_outcomes: Mutex::new(start_outcomes),
            expected_code: expected_code.into(),
        }
    }
}

impl UpstreamBehavior for ScriptedBehavior {
    fn start_verification(&self, _submitted_to: &str) -> StartVerificationOutcome {
        self.start_outcomes
            .lock()
            .expect("scripted behavior mutex poisoned")
            .pop()
            .unwrap_or(StartVerificationOutcome::Accepted)
    }

    fn check_verification(&self, _handle: &str, submitted_code: &str) -> CheckVerificationOutcome {
        if submitted_code == self.expected_code {
            CheckVerificationOutcome::Match
        } else {
            CheckVerificationOutcome::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_scripted_outcomes_in_order_then_falls_back_to_accepted() {
        let behavior = ScriptedBehavior::scripted(
            vec![StartVerificationOutcome::Rejected("blocked".to_owned())],
            "123456",
        );
        assert!(matches!(
            behavior.start_verification("+15555550100"),
            StartVerificationOutcome::Rejected(_)
        ));
        assert!(matches!(
            behavior.start_verification("+15555550100"),
            StartVerificationOutcome::Accepted
        ));
    }

    #[test]
    fn checks_against_expected_code() {
        let behavior = ScriptedBehavior::accepting("654321");
        assert!(matches!(
            behavior.check_verification("handle-1", "654321"),
            CheckVerificationOutcome::Match
        ));
        assert!(matches!(
            behavior.check_verification("handle-1", "000000"),
            CheckVerificationOutcome::NoMatch
        ));
    }
}
