//! `hrdesk-core` -- the draft-reconciliation state controller shared by the
//! console's editable details screens.
//!
//! The crate has no I/O of its own. The remote entity store, the draft
//! key-value store, the reference-list source, and the notification sink are
//! injected through the traits in [`ports`].
//!
//! - [`snapshot`] -- baseline capture and key-order-independent dirty checks.
//! - [`draft`] -- namespaced draft persistence with empty and redundant-write
//!   guards, plus the write debouncer.
//! - [`mode`] -- the View / Edit / Add machine and action enablement.
//! - [`relation`] -- many-to-many add/remove diffing and the concurrent sync
//!   batch.
//! - [`restore`] -- the reference → entity → draft load sequence.
//! - [`controller`] -- [`DetailController`], which ties the pieces together.
//! - [`screens`] -- the concrete screen definitions.

pub mod controller;
pub mod draft;
pub mod error;
pub mod form;
pub mod mode;
pub mod ports;
pub mod relation;
pub mod restore;
pub mod screens;
pub mod snapshot;
pub mod types;

pub use controller::{ControllerOptions, DetailController, SaveOutcome};
pub use error::CoreError;
pub use screens::ScreenSpec;
