#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockin_core::{CONTAINER_ID, ConfigPatch, HostPage, WidgetHandle, WidgetMode};
use lockin_harness::{MemoryPage, PageFault, RecordingRenderer, test_controller, widget_config};

#[derive(Arbitrary, Debug)]
enum Step {
    Create { open: bool, mode: u8 },
    Update { open: Option<bool>, mode: Option<u8>, text: Option<String> },
    Unmount,
    WipeBody,
    RemoveContainer,
    Fault(u8),
    FailNextRoot,
}

fn mode(raw: u8) -> WidgetMode {
    match raw % 3 {
        0 => WidgetMode::Read,
        1 => WidgetMode::Chat,
        _ => WidgetMode::Notes,
    }
}

fuzz_target!(|steps: Vec<Step>| {
    let (ctl, journal) = test_controller();
    let mut handle: Option<WidgetHandle<MemoryPage, RecordingRenderer>> = None;

    for step in steps.into_iter().take(256) {
        match step {
            Step::Create { open, mode: raw } => {
                let config = widget_config().with_open(open).with_mode(mode(raw));
                if let Ok(created) = ctl.create(config) {
                    handle = Some(created);
                }
            }
            Step::Update { open, mode: raw, text } => {
                if let Some(handle) = &handle {
                    let mut patch = ConfigPatch::new();
                    if let Some(open) = open {
                        patch = patch.with_open(open);
                    }
                    if let Some(raw) = raw {
                        patch = patch.with_mode(mode(raw));
                    }
                    if let Some(text) = text {
                        patch = patch.with_selected_text(Some(text));
                    }
                    let before = journal.render_count();
                    let applied = handle.update_props(patch).is_applied();
                    assert_eq!(journal.render_count(), before + usize::from(applied));
                }
            }
            Step::Unmount => {
                if let Some(handle) = &handle {
                    handle.unmount();
                }
                assert!(!ctl.is_live());
                assert_eq!(ctl.page().count_with_id(CONTAINER_ID), 0);
            }
            Step::WipeBody => ctl.page().wipe_body(),
            Step::RemoveContainer => {
                if let Some(node) = ctl.container() {
                    let _ = ctl.page().remove(&node);
                }
            }
            // Failed removals legitimately leave nodes behind; only fault insertion.
            Step::Fault(raw) => ctl.page().inject_fault(if raw % 2 == 0 {
                PageFault::Create
            } else {
                PageFault::Append
            }),
            Step::FailNextRoot => ctl.renderer().fail_next_root(),
        }

        assert!(ctl.page().count_with_id(CONTAINER_ID) <= 1);
        assert!(journal.live_roots().len() <= 1);
    }
});
