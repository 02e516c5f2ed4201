pub mod error;
pub mod protocol;
pub mod shell;
pub mod timestamp;
pub mod verb;

pub use protocol::{ActivityEvent, ActivityRecord, Identity, JournalEntry};
pub use verb::VerbKind;
