pub mod assertion;
pub mod executor;
pub mod json_diff;
pub mod json_path;
pub mod scheduler;
pub mod template;

pub use executor::ProbeExecutor;
pub use scheduler::{ProbeScheduler, SchedulerOptions};
