pub mod codec;
pub mod config;
pub mod db;
pub mod humanize;
pub mod observability;
pub mod queue;
pub mod server;
pub mod store;

pub use codec::{Bookmark, Record, RecordKind};
pub use db::SignalDb;
pub use queue::{FileQueue, Handle, QueueEntry};
pub use store::DbStore;
