#![forbid(unsafe_code)]

//! Test harness for the Lock-in widget lifecycle.
//!
//! Provides an in-memory page, a renderer that journals every call, capability
//! doubles, and tracing helpers. The controller's integration and property
//! suites live in this crate's `tests/` directory and run natively.

pub mod fixtures;
pub mod logging;
pub mod page;
pub mod renderer;

pub use fixtures::{FakeApi, MemoryStorage, counting_toggle, widget_config};
pub use logging::{CapturedEvent, capture, init_test_logging};
pub use page::{MemoryPage, NodeId, PageFault};
pub use renderer::{Journal, RecordingRenderer, RecordingRoot, RenderEvent, RootId};

use lockin_core::{ControllerOptions, WidgetController};

/// Controller wired to an in-memory page and a recording renderer.
pub type TestController = WidgetController<MemoryPage, RecordingRenderer>;

/// Fresh controller plus the journal of its renderer.
#[must_use]
pub fn test_controller() -> (TestController, Journal) {
    test_controller_with(ControllerOptions::default())
}

#[must_use]
pub fn test_controller_with(options: ControllerOptions) -> (TestController, Journal) {
    let renderer = RecordingRenderer::new();
    let journal = renderer.journal();
    (
        WidgetController::with_options(MemoryPage::new(), renderer, options),
        journal,
    )
}
