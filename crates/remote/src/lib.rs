//! Remote entity-management API and output dispatch.
//!
//! This crate provides:
//! - `EntityApi` trait for the create-action / update-property operations
//! - An HTTP implementation over `reqwest` and a logging dry-run implementation
//! - `OutputDispatcher`, which routes a rule payload to the matching remote call

pub mod dispatcher;
pub mod dry_run;
pub mod http;
pub mod traits;

pub use dispatcher::{DispatchError, OutputDispatcher};
pub use dry_run::DryRunApi;
pub use http::HttpEntityApi;
pub use traits::{EntityApi, RemoteError};
