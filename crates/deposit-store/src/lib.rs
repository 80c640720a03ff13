//! # deposit-store
//!
//! Persistence backends for the dorm-deposit engine.
//!
//! This crate provides two implementations of the core store traits plus
//! the facade that picks between them:
//!
//! 1. **JsonFileStore** - flat JSON file per collection under a data
//!    directory, the mirror server's storage and the offline fallback
//! 2. **RemoteStore** - HTTP client against a running deposit-api mirror
//! 3. **connect_backend** - probes the mirror's health endpoint once and
//!    commits to remote or local for the whole session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deposit_store::{connect_backend, BackendKind};
//!
//! // Remote if reachable, local files otherwise
//! let backend = connect_backend(Some("http://localhost:3001"), "data").await?;
//!
//! if backend.kind == BackendKind::Local {
//!     println!("mirror offline, storing locally");
//! }
//! let payments = backend.payments.list_all().await?;
//! ```

pub mod file;
pub mod remote;
pub mod select;

// Re-exports
pub use file::JsonFileStore;
pub use remote::RemoteStore;
pub use select::{connect_backend, Backend, BackendKind};
