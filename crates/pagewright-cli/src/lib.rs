//! # pagewright-cli
//!
//! Management commands for pagewright and the `pagewright` binary.
//!
//! - **Command framework** - [`command::ManagementCommand`] and
//!   [`command::CommandRegistry`]
//! - **Built-in commands** - `runserver`, `render`, `clearcache`, `check`
//! - **Settings discovery** - [`config::load_settings`]
//!
//! ## Quick Start
//!
//! ```rust
//! use pagewright_cli::command::CommandRegistry;
//! use pagewright_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert!(names.contains(&"runserver"));
//! assert!(names.contains(&"render"));
//! ```

pub mod command;
pub mod commands;
pub mod config;
