// src/rehab.rs
//! Rehabilitation mode: drive the stimulation relay for a fixed time

use crate::config::RehabConfig;
use crate::error::PureItResult;
use crate::hal::traits::RelayActuator;
use crate::hal::types::RelayState;
use tracing::{error, info, warn};

/// Holds the relay on and switches it off when dropped
pub struct RelayGuard<'a, R: RelayActuator + ?Sized> {
    relay: Option<&'a mut R>,
}

impl<'a, R: RelayActuator + ?Sized> RelayGuard<'a, R> {
    /// Switch the relay on. If that fails the relay is driven off again
    /// before the error is returned.
    pub fn engage(relay: &'a mut R) -> PureItResult<Self> {
        if let Err(e) = relay.set_state(RelayState::On) {
            if let Err(off) = relay.set_state(RelayState::Off) {
                error!("Relay stuck after failed engage: {}", off);
            }
            return Err(e);
        }
        Ok(Self { relay: Some(relay) })
    }

    pub fn state(&self) -> RelayState {
        self.relay.as_ref().map_or(RelayState::Off, |relay| relay.state())
    }

    /// Switch off now and report the outcome
    pub fn release(mut self) -> PureItResult<()> {
        match self.relay.take() {
            Some(relay) => relay.set_state(RelayState::Off),
            None => Ok(()),
        }
    }
}

impl<R: RelayActuator + ?Sized> Drop for RelayGuard<'_, R> {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.take() {
            warn!("Relay released without an explicit stop");
            if let Err(e) = relay.set_state(RelayState::Off) {
                error!("Failed to switch relay off: {}", e);
            }
        }
    }
}

/// Progress reported after each one-second tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RehabTick {
    Running { elapsed_s: u64 },
    Complete { elapsed_s: u64 },
}

/// One rehabilitation run, advanced by one tick per second.
///
/// The relay is on from [`RehabSession::start`] until [`RehabSession::finish`]
/// or until the session is dropped, whichever comes first.
pub struct RehabSession<'a, R: RelayActuator + ?Sized> {
    guard: RelayGuard<'a, R>,
    duration_s: u64,
    elapsed_s: u64,
}

impl<'a, R: RelayActuator + ?Sized> RehabSession<'a, R> {
    pub fn start(relay: &'a mut R, config: &RehabConfig) -> PureItResult<Self> {
        config.validate()?;
        let guard = RelayGuard::engage(relay)?;
        info!("Rehabilitation started for {} s", config.duration_s);
        Ok(Self {
            guard,
            duration_s: config.duration_s,
            elapsed_s: 0,
        })
    }

    pub fn elapsed_s(&self) -> u64 {
        self.elapsed_s
    }

    pub fn remaining_s(&self) -> u64 {
        self.duration_s.saturating_sub(self.elapsed_s)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_s >= self.duration_s
    }

    pub fn relay_state(&self) -> RelayState {
        self.guard.state()
    }

    /// Line for the operator display
    pub fn status_line(&self) -> String {
        format!("Rehab: {} s", self.elapsed_s)
    }

    /// Account for one elapsed second
    pub fn tick(&mut self) -> RehabTick {
        if !self.is_complete() {
            self.elapsed_s += 1;
        }
        if self.is_complete() {
            RehabTick::Complete { elapsed_s: self.elapsed_s }
        } else {
            RehabTick::Running { elapsed_s: self.elapsed_s }
        }
    }

    /// Switch the relay off, returning the seconds the session ran
    pub fn finish(self) -> PureItResult<u64> {
        let elapsed_s = self.elapsed_s;
        self.guard.release()?;
        info!("Rehabilitation finished after {} s", elapsed_s);
        Ok(elapsed_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommunicationProtocol, PureItError, PureItErrorBuilder};
    use crate::hal::devices::LoggingRelay;

    fn config(duration_s: u64) -> RehabConfig {
        RehabConfig {
            duration_s,
            ..RehabConfig::default()
        }
    }

    /// Refuses to switch on
    struct JammedRelay {
        state: RelayState,
        attempts: Vec<RelayState>,
    }

    impl RelayActuator for JammedRelay {
        fn set_state(&mut self, state: RelayState) -> PureItResult<()> {
            self.attempts.push(state);
            if state == RelayState::On {
                return Err(PureItErrorBuilder::new("relay", "set_state")
                    .communication(CommunicationProtocol::Gpio, "pin busy"));
            }
            self.state = state;
            Ok(())
        }

        fn state(&self) -> RelayState {
            self.state
        }
    }

    #[test]
    fn test_full_session() {
        let mut relay = LoggingRelay::new(17, true);
        let mut session = RehabSession::start(&mut relay, &config(3)).unwrap();
        assert_eq!(session.relay_state(), RelayState::On);

        assert_eq!(session.tick(), RehabTick::Running { elapsed_s: 1 });
        assert_eq!(session.tick(), RehabTick::Running { elapsed_s: 2 });
        assert_eq!(session.status_line(), "Rehab: 2 s");
        assert_eq!(session.tick(), RehabTick::Complete { elapsed_s: 3 });
        assert_eq!(session.tick(), RehabTick::Complete { elapsed_s: 3 });
        assert_eq!(session.remaining_s(), 0);

        assert_eq!(session.finish().unwrap(), 3);
        assert_eq!(relay.history(), &[RelayState::On, RelayState::Off]);
    }

    #[test]
    fn test_dropped_session_switches_relay_off() {
        let mut relay = LoggingRelay::new(17, true);
        {
            let mut session = RehabSession::start(&mut relay, &config(10)).unwrap();
            session.tick();
        }
        assert_eq!(relay.state(), RelayState::Off);
        assert_eq!(relay.history(), &[RelayState::On, RelayState::Off]);
    }

    #[test]
    fn test_failed_engage_leaves_relay_off() {
        let mut relay = JammedRelay {
            state: RelayState::Off,
            attempts: Vec::new(),
        };
        {
            let result = RehabSession::start(&mut relay, &config(10));
            assert!(matches!(result, Err(PureItError::Communication { .. })));
        }
        assert_eq!(relay.attempts, vec![RelayState::On, RelayState::Off]);
        assert_eq!(relay.state(), RelayState::Off);
    }

    #[test]
    fn test_zero_duration_rejected_before_engaging() {
        let mut relay = LoggingRelay::new(17, true);
        assert!(RehabSession::start(&mut relay, &config(0)).is_err());
        assert!(relay.history().is_empty());
    }
}
