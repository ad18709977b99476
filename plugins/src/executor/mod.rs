pub mod renderers;
pub mod strategies;

pub use renderers::{JsonlRendererPlugin, TextRendererPlugin};
pub use strategies::{
    build_retry_strategy, ExponentialBackoffPlugin, FixedDelayPlugin, LinearRetryPlugin,
};
