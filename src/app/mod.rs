mod export;
mod progress;
mod runner;
pub(crate) mod summary;


pub use export::export_json;
pub use runner::{QueueFeed, RunOutcome, build_task_source, run_local};
pub use summary::summary_lines;
