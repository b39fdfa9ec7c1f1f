pub mod config;
pub mod error;
pub mod form;
pub mod history;
pub mod pump;
pub mod submission;
pub mod topics;
pub mod types;
pub mod validator;

pub use config::{DashboardConfig, NetworkConfig, RevalidationPolicy, RuntimeConfig};
pub use error::{ParseError, TransportError};
pub use form::{AuthoritativeSettings, FormState, SettingsSnapshot};
pub use history::{EventType, History, HistorySnapshot, Measurement, WateringEvent};
pub use pump::{can_trigger, label_for, PumpControl, PumpTransport, PumpTriggerPayload};
pub use submission::{
    SettingsPayload, SettingsTransport, SubmissionController, SubmissionOutcome,
};
pub use topics::*;
pub use types::{
    Field, FieldName, FieldValue, PumpPhase, SettingsView, StatsView, SubmissionState,
};
pub use validator::{validate, Siblings};
