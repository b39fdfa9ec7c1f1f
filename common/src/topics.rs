pub const TOPIC_SETTINGS_STATE: &str = "waterbot/settings/state";
pub const TOPIC_SETTINGS_RESULT: &str = "waterbot/settings/result";
pub const TOPIC_SETTINGS_FLAGS: &str = "waterbot/settings/flags";

pub const TOPIC_PUMP_STATE: &str = "waterbot/pump/state";

pub const TOPIC_HISTORY_STATE: &str = "waterbot/history/state";
pub const TOPIC_HISTORY_MEASUREMENT: &str = "waterbot/history/measurement";
pub const TOPIC_HISTORY_EVENT: &str = "waterbot/history/event";

pub const TOPIC_CMD_SETTINGS_FETCH: &str = "waterbot/cmnd/settings/fetch";
pub const TOPIC_CMD_SETTINGS_SUBMIT: &str = "waterbot/cmnd/settings/submit";
pub const TOPIC_CMD_HISTORY_FETCH: &str = "waterbot/cmnd/history/fetch";
pub const TOPIC_CMD_PUMP: &str = "waterbot/cmnd/pump/trigger";
