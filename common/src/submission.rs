use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::TransportError,
    form::{AuthoritativeSettings, FormState, SettingsSnapshot},
    types::SubmissionState,
};

/// Outbound save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPayload {
    pub name: String,
    pub upper: i64,
    pub lower: i64,
    pub interval: i64,
    pub token: String,
}

impl SettingsPayload {
    pub fn new(snapshot: SettingsSnapshot, token: &str) -> Self {
        Self {
            name: snapshot.name,
            upper: snapshot.upper,
            lower: snapshot.lower,
            interval: snapshot.interval,
            token: token.to_string(),
        }
    }
}

/// Result of a save request, reported asynchronously by the settings source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Saved { settings: AuthoritativeSettings },
    Failed { reason: String },
}

/// Hands a save request to whatever talks to the settings source. Delivery is
/// fire-and-forget; the outcome comes back through
/// [`SubmissionController::complete`].
pub trait SettingsTransport {
    fn send_settings(&mut self, payload: &SettingsPayload) -> Result<(), TransportError>;

    fn request_settings(&mut self) -> Result<(), TransportError>;
}

/// Local mirror of the settings source: the last authoritative settings, the
/// request flags, and the in-flight guard that keeps saves non-reentrant.
#[derive(Debug, Clone, Default)]
pub struct SubmissionController {
    state: SubmissionState,
    settings: AuthoritativeSettings,
    in_flight: bool,
}

impl SubmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn device_name(&self) -> Option<&str> {
        self.settings.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Requests the current settings, as done when the settings screen mounts.
    pub fn fetch<T: SettingsTransport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        transport.request_settings()?;
        self.state.is_fetching = true;
        self.state.is_erroneous = false;
        Ok(())
    }

    /// Records settings pushed by the source and offers them to the form.
    /// Returns whether the form was reset.
    pub fn receive_settings(
        &mut self,
        settings: AuthoritativeSettings,
        form: &mut FormState,
    ) -> bool {
        self.state.is_fetching = false;
        self.settings = settings;
        form.initialize_from_authoritative(&self.settings, &self.state)
    }

    /// Overwrites the request flags with the ones reported by the source.
    pub fn apply_state(&mut self, state: SubmissionState) {
        self.state = state;
        if !state.is_submitting {
            self.in_flight = false;
        }
    }

    /// Sends the form if it is submittable and nothing is in flight. Returns
    /// `Ok(false)` when the call was ignored.
    pub fn submit<T: SettingsTransport + ?Sized>(
        &mut self,
        form: &FormState,
        token: &str,
        transport: &mut T,
    ) -> Result<bool, TransportError> {
        if self.in_flight || self.state.is_submitting {
            debug!("submit ignored: a submission is already in flight");
            return Ok(false);
        }
        if !form.is_submittable() {
            debug!(pristine = form.is_pristine(), "submit ignored: form not submittable");
            return Ok(false);
        }

        let payload = SettingsPayload::new(form.snapshot(), token);
        if let Err(err) = transport.send_settings(&payload) {
            warn!("settings submission could not be dispatched: {err}");
            return Err(err);
        }

        info!(
            name = %payload.name,
            upper = payload.upper,
            lower = payload.lower,
            interval = payload.interval,
            "settings submitted"
        );
        self.in_flight = true;
        self.state.is_submitting = true;
        self.state.is_erroneous = false;
        Ok(true)
    }

    /// Applies the outcome of the in-flight save. Success resets the form from
    /// the confirmed settings; failure leaves the edits in place. Outcomes that
    /// arrive with nothing in flight belong to another client and are ignored.
    pub fn complete(&mut self, outcome: SubmissionOutcome, form: &mut FormState) -> bool {
        if !self.in_flight {
            debug!(?outcome, "submission outcome ignored: nothing in flight");
            return false;
        }
        self.in_flight = false;
        self.state.is_submitting = false;

        match outcome {
            SubmissionOutcome::Saved { settings } => {
                info!("settings saved");
                self.state.is_erroneous = false;
                self.settings = settings;
                form.initialize_from_authoritative(&self.settings, &self.state)
            }
            SubmissionOutcome::Failed { reason } => {
                warn!("settings submission failed: {reason}");
                self.state.is_erroneous = true;
                false
            }
        }
    }
}
