use chrono::NaiveDate;
use thiserror::Error;

/// Structural problems with a model. Any of these aborts a whole evaluation run.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid date `{value}` for {context}")]
    InvalidDate { context: String, value: String },
    #[error("invalid value `{value}` for {context}")]
    InvalidValue { context: String, value: String },
    #[error("invalid recurrence `{value}` for {context}")]
    InvalidRecurrence { context: String, value: String },
    #[error("invalid quantity `{value}` for {context}")]
    InvalidQuantity { context: String, value: String },
    #[error("trigger name `{0}` must not contain `+` or `-`")]
    ReservedCharacter(String),
    #[error("cyclic reference through `{0}`")]
    CyclicReference(String),
    #[error("unknown reference `{name}` in {context}")]
    UnknownReference { context: String, name: String },
    #[error("setting `{0}` is not numeric")]
    TextSetting(String),
    #[error("transaction `{0}` needs a cash asset")]
    MissingCash(String),
    #[error("range of interest is missing or invalid: {0}")]
    MissingRoi(String),
    #[error("model version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn invalid_date(context: impl Into<String>, value: impl Into<String>) -> Self {
        ModelError::InvalidDate {
            context: context.into(),
            value: value.into(),
        }
    }

    pub(crate) fn invalid_value(context: impl Into<String>, value: impl Into<String>) -> Self {
        ModelError::InvalidValue {
            context: context.into(),
            value: value.into(),
        }
    }

    pub(crate) fn unknown(context: impl Into<String>, name: impl Into<String>) -> Self {
        ModelError::UnknownReference {
            context: context.into(),
            name: name.into(),
        }
    }
}

/// A transaction occurrence the engine declined to apply. The run continues.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SkippedTransaction {
    pub name: String,
    pub date: NaiveDate,
    pub item: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SkipReason {
    /// The item may not go negative and the occurrence would overdraw it.
    WouldGoNegative,
    /// A bond maturity found no outstanding investment to pay out.
    NoBondLot,
}
