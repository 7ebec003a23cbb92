//! # pagewright-template
//!
//! The template composition pipeline. Turns on-disk template fragments plus
//! JSON content from the remote platform into one composed HTML page.
//!
//! ## Stages
//!
//! 1. [`composer`] assembles header, page body and footer into one document,
//!    with the live page's chrome and `mainContent` sealed by [`script_guard`]
//! 2. [`blocks`] inlines `{@|apply name.block}` includes
//! 3. [`script_guard`] shields literal `<script>` content from the engine
//! 4. [`query`] resolves `<site:query>` directives one at a time and seals
//!    their output
//! 5. [`navigation`] and [`links`] inject navigation and absolutize share
//!    links, in sealed remote text as well
//! 6. [`engine`] expands the text against page JSON, then every shielded
//!    literal is restored
//! 7. [`block_field`] renders `<site:block-field>` grids
//!
//! [`pipeline::Renderer`] drives the stages for one request; all mutable
//! state lives in a per-request [`context::RenderContext`].

pub mod block_field;
pub mod block_kinds;
pub mod blocks;
pub mod composer;
pub mod context;
pub mod directive;
pub mod engine;
pub mod fetch;
pub mod html;
pub mod links;
pub mod loaders;
pub mod navigation;
pub mod pipeline;
pub mod query;
pub mod script_guard;

pub use engine::Engine;
pub use loaders::TemplateSource;
pub use pipeline::{Rendered, Renderer};
