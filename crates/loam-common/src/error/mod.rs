pub mod journal_error;
pub mod shell_error;

pub use journal_error::{IdentityError, JournalLineError, TimestampError};
pub use shell_error::ShellError;
