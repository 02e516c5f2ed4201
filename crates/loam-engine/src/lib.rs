pub mod command;
pub mod config;
pub mod error;
pub mod history;
pub mod journal;
pub mod lock;
pub mod replay;
pub mod retention;
pub mod scanner;
pub mod session;
pub mod storage;

pub use loam_common::protocol;
pub use loam_common::shell;
pub use loam_common::timestamp;
pub use loam_common::{ActivityRecord, Identity, JournalEntry, VerbKind};
