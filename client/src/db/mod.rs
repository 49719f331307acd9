//! Local SQLite persistence: record stores, mutation queue, sync metadata.

mod metadata;
mod pool;
mod queue;
mod records;

pub use metadata::*;
pub use pool::*;
pub use queue::*;
pub use records::*;
