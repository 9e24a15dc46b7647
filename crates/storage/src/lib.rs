#![forbid(unsafe_code)]

pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod supabase;

pub use memory::{InMemoryBackend, InMemoryLocalStore};
pub use repository::{Backend, StorageError};
