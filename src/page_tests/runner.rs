use crate::events::{CrawlEvent, EventBus};
use crate::page_tests::{PageContext, TestRecorder, TestRegistry, TestResults};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Outcome counts for one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestRunSummary {
    pub passed: usize,
    pub failed: usize,
}

/// Runs every registered test against a page
///
/// Emits `BeforeTests`, then `BeforeTest`/`AfterTest` around each test in
/// registration order, then `AfterTests`. A test that errors or panics is
/// reported as `TestFailed` and does not stop the remaining tests. Values a
/// test recorded before failing are kept in `results`.
pub fn run_all(
    registry: &TestRegistry,
    page: &PageContext<'_>,
    bus: &mut EventBus,
    results: &mut TestResults,
) -> TestRunSummary {
    let mut summary = TestRunSummary::default();

    bus.trigger(&CrawlEvent::BeforeTests { url: page.url });

    for (definition, test) in registry.runnable() {
        let name = definition.name();
        bus.trigger(&CrawlEvent::BeforeTest { name, page });

        let mut recorder = TestRecorder::new(definition, page.url, results);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| test.run(page, &mut recorder))) {
            Ok(result) => result.map_err(|e| format!("{:#}", e)),
            Err(payload) => Err(panic_message(payload.as_ref())),
        };

        match outcome {
            Ok(()) => summary.passed += 1,
            Err(error) => {
                tracing::warn!("Test '{}' failed on {}: {}", name, page.url, error);
                summary.failed += 1;
                bus.trigger(&CrawlEvent::TestFailed {
                    name,
                    url: page.url,
                    error: &error,
                });
            }
        }

        bus.trigger(&CrawlEvent::AfterTest { name, page });
    }

    bus.trigger(&CrawlEvent::AfterTests { url: page.url });
    summary
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
