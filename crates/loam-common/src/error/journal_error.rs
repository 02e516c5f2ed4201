use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("unrecognised timestamp '{0}'")]
    Unrecognised(String),
    #[error("timestamp out of range '{0}'")]
    OutOfRange(String),
}

/// Reasons a single journal line cannot be replayed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JournalLineError {
    #[error("missing ',' separator")]
    MissingSeparator,
    #[error("empty command")]
    EmptyCommand,
    #[error("bad timestamp: {0}")]
    Timestamp(#[from] TimestampError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity must not be empty")]
    Empty,
}
