use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalParseError {
    #[error("journal line is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("journal line has no event name")]
    MissingEventName,
    #[error("journal event {event} is missing field {field}")]
    MissingField {
        event: String,
        field: &'static str,
    },
    #[error("journal event {event} has invalid timestamp '{raw}'")]
    InvalidTimestamp { event: String, raw: String },
    #[error("journal event {event} has invalid field {field}")]
    InvalidField {
        event: String,
        field: &'static str,
    },
}
