pub mod executor;
pub mod factory;

pub use executor::{build_retry_strategy, JsonlRendererPlugin, TextRendererPlugin};
pub use factory::{build_task_factory, CommandTaskFactory, SimulatedTaskFactory};
