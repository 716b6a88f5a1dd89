//! Draft backing stores for hosts without browser session storage.

pub mod file;

pub use file::{FileDraftStore, FileStoreError};
