//! HTTP adapters for the hrdesk REST API.
//!
//! [`HrApi`] wraps a [`reqwest::Client`] and the API base URL.
//! [`HttpEntityStore`] implements the core `RemoteEntityStore` port for one
//! [`Resource`], and [`ActiveInterviewers`] implements `ReferenceSource` for
//! the interviewer picker.

pub mod api;
pub mod resource;
pub mod store;

pub use api::{ApiError, HrApi};
pub use resource::Resource;
pub use store::{ActiveInterviewers, HttpEntityStore};
