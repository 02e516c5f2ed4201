//! An in-memory filesystem that replayed journals can be run against.
//!
//! It is rebuilt empty for every session, which is exactly the environment
//! the journal exists to make look persistent.

pub mod backend;
pub mod path;
pub mod tree;

pub use backend::MemoryFs;
pub use tree::{EntryKind, Stat};
