//! # pagewright-server
//!
//! The HTTP face of pagewright. [`PagewrightApp`] wraps a
//! [`Renderer`](pagewright_template::Renderer) in an Axum router that answers
//! every GET path with a rendered page and serves template assets under
//! `/assets/`.
//!
//! ## Modules
//!
//! - [`server`] - Application builder, router, and `run`
//! - [`response`] - Mapping render results and errors onto HTTP responses

pub mod response;
pub mod server;

pub use server::PagewrightApp;
