pub mod command;
pub mod simulated;

use std::sync::Arc;

use anyhow::Result;
use fanout_core::executor::traits::TaskFactory;

pub use command::CommandTaskFactory;
pub use simulated::SimulatedTaskFactory;

pub fn build_task_factory(kind: &str) -> Result<Arc<dyn TaskFactory>> {
    match kind.trim() {
        "simulated" => Ok(Arc::new(SimulatedTaskFactory::new())),
        "command" | "shell" => Ok(Arc::new(CommandTaskFactory::new())),
        other => Err(anyhow::anyhow!(
            "unknown task factory '{other}' (expected simulated or command)"
        )),
    }
}
