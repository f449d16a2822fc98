//! Bounded re-capture and re-match until a template shows up or goes away.
//!
//! Each attempt takes a fresh screenshot, matches it, and feeds the result to
//! [`transition`]. Between attempts the poller sleeps for the interval; the
//! sleep ends early on shutdown.

use super::capture::ScreenSource;
use super::shutdown::Shutdown;
use super::types::{Observation, PollMode, PollOutcome, PollReport, PollSpec};
use crate::logging::device_log;
use crate::template_matching::{MatchEngine, MatchResult, Template};
use tokio::time::Instant;

/// Terminal outcome for one observation, or `None` to keep polling
pub fn transition(mode: PollMode, observation: Observation) -> Option<PollOutcome> {
    match (mode, observation) {
        (_, Observation::CaptureFailed) => Some(PollOutcome::CaptureFailed),
        (PollMode::AwaitAppear, Observation::Present) => Some(PollOutcome::Appeared),
        (PollMode::AwaitDisappear, Observation::Absent) => Some(PollOutcome::Disappeared),
        _ => None,
    }
}

pub struct VisibilityPoller<'a, S: ScreenSource> {
    source: &'a S,
    engine: &'a MatchEngine,
    device_id: &'a str,
    shutdown: Shutdown,
}

impl<'a, S: ScreenSource> VisibilityPoller<'a, S> {
    pub fn new(source: &'a S, engine: &'a MatchEngine, device_id: &'a str, shutdown: Shutdown) -> Self {
        Self {
            source,
            engine,
            device_id,
            shutdown,
        }
    }

    pub async fn poll(&self, target: &Template, spec: PollSpec) -> PollReport {
        let id = self.device_id;
        match spec.mode {
            PollMode::AwaitAppear => device_log!(info, id, "Waiting for '{}' to appear...", target.name()),
            PollMode::AwaitDisappear => {
                device_log!(info, id, "Waiting for '{}' to disappear...", target.name())
            }
        }

        let start = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_match = None;
        let report = |outcome: PollOutcome, attempts: u32, last_match: Option<MatchResult>| PollReport {
            outcome,
            attempts,
            elapsed: start.elapsed(),
            last_match,
        };

        while start.elapsed() < spec.timeout {
            if self.shutdown.is_triggered() {
                return report(PollOutcome::Cancelled, attempts, last_match);
            }
            attempts += 1;

            let observation = match self.source.capture().await {
                Err(e) => {
                    device_log!(error, id, "Failed to read screenshot during waiting period: {e}");
                    Observation::CaptureFailed
                }
                Ok(screenshot) => match self.engine.locate(&screenshot, target).await {
                    Ok(found) => {
                        last_match = found;
                        if found.is_some() {
                            Observation::Present
                        } else {
                            Observation::Absent
                        }
                    }
                    Err(e) => {
                        device_log!(error, id, "Failed to match screenshot during waiting period: {e}");
                        Observation::CaptureFailed
                    }
                },
            };

            if let Some(outcome) = transition(spec.mode, observation) {
                match outcome {
                    PollOutcome::Appeared => {
                        device_log!(info, id, "'{}' appeared on the screen.", target.name())
                    }
                    PollOutcome::Disappeared => {
                        device_log!(info, id, "'{}' is no longer found on the screen.", target.name())
                    }
                    _ => {}
                }
                return report(outcome, attempts, last_match);
            }

            match spec.mode {
                PollMode::AwaitAppear => device_log!(
                    debug,
                    id,
                    "'{}' not present yet (attempt {attempts}). Checking again in {:?}...",
                    target.name(),
                    spec.interval
                ),
                PollMode::AwaitDisappear => device_log!(
                    debug,
                    id,
                    "'{}' still present (attempt {attempts}). Checking again in {:?}...",
                    target.name(),
                    spec.interval
                ),
            }
            if !self.shutdown.sleep(spec.interval).await {
                device_log!(info, id, "Poll for '{}' cancelled", target.name());
                return report(PollOutcome::Cancelled, attempts, last_match);
            }
        }

        device_log!(
            warn,
            id,
            "Timeout reached after {:?}: '{}' {}",
            spec.timeout,
            target.name(),
            match spec.mode {
                PollMode::AwaitAppear => "did not appear on the screen.",
                PollMode::AwaitDisappear => "is still on the screen.",
            }
        );
        report(PollOutcome::TimedOut, attempts, last_match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appear_confirms_on_present() {
        assert_eq!(
            transition(PollMode::AwaitAppear, Observation::Present),
            Some(PollOutcome::Appeared)
        );
        assert_eq!(transition(PollMode::AwaitAppear, Observation::Absent), None);
    }

    #[test]
    fn test_disappear_confirms_on_absent() {
        assert_eq!(
            transition(PollMode::AwaitDisappear, Observation::Absent),
            Some(PollOutcome::Disappeared)
        );
        assert_eq!(transition(PollMode::AwaitDisappear, Observation::Present), None);
    }

    #[test]
    fn test_capture_failure_is_terminal_in_both_modes() {
        for mode in [PollMode::AwaitAppear, PollMode::AwaitDisappear] {
            assert_eq!(
                transition(mode, Observation::CaptureFailed),
                Some(PollOutcome::CaptureFailed)
            );
        }
    }

    #[test]
    fn test_confirmed_outcomes() {
        assert!(PollOutcome::Appeared.is_confirmed());
        assert!(PollOutcome::Disappeared.is_confirmed());
        assert!(!PollOutcome::TimedOut.is_confirmed());
        assert!(!PollOutcome::CaptureFailed.is_confirmed());
        assert!(!PollOutcome::Cancelled.is_confirmed());
    }
}
