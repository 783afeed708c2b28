//! Page tests and the runner that executes them
//!
//! A page test is any [`PageTest`] registered on the [`TestRegistry`] before
//! the crawl starts. Every fetched HTML page is handed to each test in
//! registration order, together with a [`TestRecorder`] for the result
//! columns the test declared.

mod registry;
mod results;
mod runner;

pub use registry::{PageContext, PageTest, TestDefinition, TestRegistry};
pub use results::{word_count, ResultEntry, TestRecorder, TestResults};
pub use runner::{run_all, TestRunSummary};
