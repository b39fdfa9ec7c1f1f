use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::DEFAULT_DEVICE_NAME,
    error::{ParseError, TransportError},
    types::PumpPhase,
};

/// Manual pump trigger request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpTriggerPayload {
    pub token: String,
}

pub trait PumpTransport {
    fn trigger_pump(&mut self, payload: &PumpTriggerPayload) -> Result<(), TransportError>;
}

pub fn can_trigger(is_logged_in: bool, phase: PumpPhase) -> bool {
    is_logged_in && phase == PumpPhase::Idle
}

pub fn label_for(phase: PumpPhase, device_name: Option<&str>) -> String {
    label_with_fallback(phase, device_name, DEFAULT_DEVICE_NAME)
}

pub fn label_with_fallback(
    phase: PumpPhase,
    device_name: Option<&str>,
    fallback: &str,
) -> String {
    match phase {
        PumpPhase::Idle => "Start pump manually".to_string(),
        PumpPhase::Checking => {
            let name = device_name.filter(|name| !name.is_empty()).unwrap_or(fallback);
            format!("Checking {name}…")
        }
        PumpPhase::Watering => "Watering…".to_string(),
        PumpPhase::SeepingIn => "Seeping in…".to_string(),
    }
}

/// Read-through projection of the device-reported pump phase plus the manual
/// trigger gate. The phase only changes on status pushes.
#[derive(Debug, Clone)]
pub struct PumpControl {
    phase: PumpPhase,
    // Set on trigger, cleared by the next status push.
    awaiting_status: bool,
    fallback_name: String,
}

impl Default for PumpControl {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_NAME)
    }
}

impl PumpControl {
    pub fn new(fallback_name: impl Into<String>) -> Self {
        Self {
            phase: PumpPhase::Idle,
            awaiting_status: false,
            fallback_name: fallback_name.into(),
        }
    }

    pub fn phase(&self) -> PumpPhase {
        self.phase
    }

    pub fn is_awaiting_status(&self) -> bool {
        self.awaiting_status
    }

    pub fn apply_status(&mut self, phase: PumpPhase) {
        if phase != self.phase {
            debug!(from = self.phase.as_str(), to = phase.as_str(), "pump phase changed");
        }
        self.phase = phase;
        self.awaiting_status = false;
    }

    pub fn apply_status_message(&mut self, message: &str) -> Result<PumpPhase, ParseError> {
        let phase = message.parse::<PumpPhase>()?;
        self.apply_status(phase);
        Ok(phase)
    }

    pub fn is_enabled(&self, token: Option<&str>) -> bool {
        can_trigger(is_logged_in(token), self.phase) && !self.awaiting_status
    }

    pub fn label(&self, device_name: Option<&str>) -> String {
        label_with_fallback(self.phase, device_name, &self.fallback_name)
    }

    /// Dispatches one trigger when enabled. Returns `Ok(false)` when inert.
    pub fn trigger<T: PumpTransport + ?Sized>(
        &mut self,
        token: Option<&str>,
        transport: &mut T,
    ) -> Result<bool, TransportError> {
        let Some(token) = token.filter(|_| self.is_enabled(token)) else {
            debug!(
                phase = self.phase.as_str(),
                awaiting = self.awaiting_status,
                "pump trigger ignored"
            );
            return Ok(false);
        };

        let payload = PumpTriggerPayload {
            token: token.to_string(),
        };
        if let Err(err) = transport.trigger_pump(&payload) {
            warn!("pump trigger could not be dispatched: {err}");
            return Err(err);
        }

        info!("manual pump trigger sent");
        self.awaiting_status = true;
        Ok(true)
    }
}

fn is_logged_in(token: Option<&str>) -> bool {
    token.is_some_and(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        triggers: Vec<PumpTriggerPayload>,
        fail: bool,
    }

    impl PumpTransport for RecordingTransport {
        fn trigger_pump(&mut self, payload: &PumpTriggerPayload) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Unavailable("broker offline".to_string()));
            }
            self.triggers.push(payload.clone());
            Ok(())
        }
    }

    const PHASES: [PumpPhase; 4] = [
        PumpPhase::Idle,
        PumpPhase::Checking,
        PumpPhase::Watering,
        PumpPhase::SeepingIn,
    ];

    #[test]
    fn only_logged_in_idle_can_trigger() {
        for logged_in in [true, false] {
            for phase in PHASES {
                let expected = logged_in && phase == PumpPhase::Idle;
                assert_eq!(can_trigger(logged_in, phase), expected, "{logged_in} {phase:?}");
            }
        }
    }

    #[test]
    fn labels_follow_phase() {
        assert_eq!(label_for(PumpPhase::Idle, Some("Fern")), "Start pump manually");
        assert_eq!(label_for(PumpPhase::Checking, Some("Fern")), "Checking Fern…");
        assert_eq!(label_for(PumpPhase::Checking, None), "Checking your flower…");
        assert_eq!(label_for(PumpPhase::Checking, Some("")), "Checking your flower…");
        assert_eq!(label_for(PumpPhase::Watering, Some("Fern")), "Watering…");
        assert_eq!(label_for(PumpPhase::SeepingIn, None), "Seeping in…");
    }

    #[test]
    fn control_uses_configured_fallback_name() {
        let mut control = PumpControl::new("the basil");
        control.apply_status(PumpPhase::Checking);

        assert_eq!(control.label(None), "Checking the basil…");
        assert_eq!(control.label(Some("Mint")), "Checking Mint…");
    }

    #[test]
    fn trigger_dispatches_once_until_status_arrives() {
        let mut control = PumpControl::default();
        let mut transport = RecordingTransport::default();

        assert!(control.trigger(Some("jwt"), &mut transport).unwrap());
        assert!(control.is_awaiting_status());
        assert!(!control.is_enabled(Some("jwt")));
        assert!(!control.trigger(Some("jwt"), &mut transport).unwrap());
        assert_eq!(transport.triggers.len(), 1);
        assert_eq!(transport.triggers[0].token, "jwt");

        control.apply_status(PumpPhase::Checking);
        assert!(!control.trigger(Some("jwt"), &mut transport).unwrap());

        control.apply_status(PumpPhase::Idle);
        assert!(control.trigger(Some("jwt"), &mut transport).unwrap());
        assert_eq!(transport.triggers.len(), 2);
    }

    #[test]
    fn trigger_is_inert_when_logged_out_or_busy() {
        let mut transport = RecordingTransport::default();

        let mut control = PumpControl::default();
        assert!(!control.trigger(None, &mut transport).unwrap());
        assert!(!control.trigger(Some(""), &mut transport).unwrap());

        for phase in [PumpPhase::Checking, PumpPhase::Watering, PumpPhase::SeepingIn] {
            control.apply_status(phase);
            assert!(!control.is_enabled(Some("jwt")));
            assert!(!control.trigger(Some("jwt"), &mut transport).unwrap());
        }

        assert!(transport.triggers.is_empty());
    }

    #[test]
    fn failed_dispatch_keeps_control_enabled() {
        let mut control = PumpControl::default();
        let mut transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };

        assert!(control.trigger(Some("jwt"), &mut transport).is_err());
        assert!(!control.is_awaiting_status());
        assert!(control.is_enabled(Some("jwt")));
    }

    #[test]
    fn status_messages_are_parsed_from_codes() {
        let mut control = PumpControl::default();

        assert_eq!(control.apply_status_message("2"), Ok(PumpPhase::Watering));
        assert_eq!(control.phase(), PumpPhase::Watering);

        assert_eq!(
            control.apply_status_message("9"),
            Err(ParseError::UnknownPhase(9))
        );
        assert_eq!(control.phase(), PumpPhase::Watering);
    }
}
