pub mod factory;
pub mod renderer;
pub mod strategy;

pub use factory::*;
pub use renderer::*;
pub use strategy::*;
