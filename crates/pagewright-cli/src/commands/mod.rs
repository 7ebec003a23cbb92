//! Built-in management commands.
//!
//! Each command implements the
//! [`ManagementCommand`](crate::command::ManagementCommand) trait.

pub mod check;
pub mod clearcache;
pub mod render;
pub mod runserver;

pub use check::CheckCommand;
pub use clearcache::ClearcacheCommand;
pub use render::RenderCommand;
pub use runserver::RunserverCommand;

use crate::command::CommandRegistry;

/// Registers all built-in management commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(RunserverCommand));
    registry.register(Box::new(RenderCommand));
    registry.register(Box::new(ClearcacheCommand));
    registry.register(Box::new(CheckCommand));
}
