//! # deposit-api
//!
//! HTTP mirror of the dorm-deposit stores.
//!
//! This crate provides:
//! - Axum-based HTTP server over the JSON-file store
//! - REST endpoints for dorms, accounts, requests, and payments
//! - Bearer-token session lookup for the owner-scoped reads
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/health` | Health check / fallback probe target |
//! | GET | `/api/dorms` | List dorm catalog |
//! | POST | `/api/users/register` | Create account |
//! | POST | `/api/users/login` | Mint session token |
//! | GET/POST | `/api/requests` | List / create requests |
//! | GET/POST | `/api/payments` | List / create payments |
//! | POST | `/api/payments/{id}/status` | Refund transition |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
