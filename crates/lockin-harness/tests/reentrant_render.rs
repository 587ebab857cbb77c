//! Widgets that call back into the controller while they render.
//!
//! Component code commonly reacts to new props synchronously (a layout effect
//! that opens the panel once text is selected, a handler that closes it). The
//! controller must accept those calls and render their result afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use lockin_core::{CONTAINER_ID, ConfigPatch, HostPage, UpdateOutcome, WidgetHandle, WidgetMode};
use lockin_harness::{
    MemoryPage, RecordingRenderer, RootId, init_test_logging, test_controller, widget_config,
};
use pretty_assertions::assert_eq;

type Slot = Rc<RefCell<Option<WidgetHandle<MemoryPage, RecordingRenderer>>>>;

fn handle_in(slot: &Slot) -> Option<WidgetHandle<MemoryPage, RecordingRenderer>> {
    slot.borrow().clone()
}

#[test]
fn update_from_inside_render_is_rendered_after_it() {
    init_test_logging();
    let (ctl, journal) = test_controller();
    let slot: Slot = Rc::default();

    let hook_slot = Rc::clone(&slot);
    ctl.renderer().on_render(move |config| {
        if config.selected_text.is_some() && !config.is_open {
            if let Some(handle) = handle_in(&hook_slot) {
                assert!(handle.update_props(ConfigPatch::new().with_open(true)).is_applied());
            }
        }
    });

    let handle = ctl.create(widget_config()).unwrap();
    *slot.borrow_mut() = Some(handle.clone());

    let outcome = handle.update_props(ConfigPatch::new().with_selected_text(Some("quote".into())));
    assert_eq!(outcome, UpdateOutcome::Applied);

    let renders = journal.renders();
    assert_eq!(renders.len(), 3);
    let (_, selected) = &renders[1];
    assert_eq!(selected.selected_text.as_deref(), Some("quote"));
    assert!(!selected.is_open);
    let (root, opened) = &renders[2];
    assert_eq!(*root, RootId(0));
    assert_eq!(opened.selected_text.as_deref(), Some("quote"));
    assert!(opened.is_open);

    assert_eq!(ctl.snapshot().as_ref(), Some(opened));
    assert_eq!(ctl.render_count(), 3);
    assert!(ctl.is_live());
    assert!(handle.is_current());
}

#[test]
fn several_updates_during_one_render_render_once_with_the_cumulative_snapshot() {
    init_test_logging();
    let (ctl, journal) = test_controller();
    let slot: Slot = Rc::default();

    let hook_slot = Rc::clone(&slot);
    ctl.renderer().on_render(move |config| {
        if config.mode == WidgetMode::Chat {
            if let Some(handle) = handle_in(&hook_slot) {
                handle.update_props(ConfigPatch::new().with_open(true));
                handle.update_props(ConfigPatch::new().with_mode(WidgetMode::Notes));
            }
        }
    });

    let handle = ctl.create(widget_config()).unwrap();
    *slot.borrow_mut() = Some(handle.clone());
    handle.update_props(ConfigPatch::new().with_mode(WidgetMode::Chat));

    let modes: Vec<_> = journal
        .renders()
        .into_iter()
        .map(|(_, config)| (config.mode, config.is_open))
        .collect();
    assert_eq!(
        modes,
        vec![
            (WidgetMode::Read, false),
            (WidgetMode::Chat, false),
            (WidgetMode::Notes, true),
        ]
    );
}

#[test]
fn unmount_from_inside_render_releases_the_root() {
    init_test_logging();
    let (ctl, journal) = test_controller();
    let slot: Slot = Rc::default();

    let hook_slot = Rc::clone(&slot);
    ctl.renderer().on_render(move |config| {
        if config.is_open {
            if let Some(handle) = handle_in(&hook_slot) {
                assert!(handle.unmount());
            }
        }
    });

    let handle = ctl.create(widget_config()).unwrap();
    *slot.borrow_mut() = Some(handle.clone());

    assert!(handle.update_props(ConfigPatch::new().with_open(true)).is_applied());
    assert!(!ctl.is_live());
    assert_eq!(ctl.container(), None);
    assert_eq!(ctl.snapshot(), None);
    assert_eq!(ctl.page().count_with_id(CONTAINER_ID), 0);
    assert_eq!(journal.unmount_count(RootId(0)), 1);
    assert!(journal.live_roots().is_empty());

    // Nothing is left half-torn: later calls behave as on an absent widget.
    assert!(!handle.unmount());
    assert_eq!(
        handle.update_props(ConfigPatch::new().with_open(false)),
        UpdateOutcome::NoRoot
    );
    slot.borrow_mut().take();
    ctl.create(widget_config()).unwrap();
    assert!(ctl.is_live());
    assert_eq!(ctl.epoch(), 2);
}

#[test]
fn create_from_inside_render_replaces_the_snapshot() {
    init_test_logging();
    let (ctl, journal) = test_controller();

    let nested = ctl.clone();
    ctl.renderer().on_render(move |config| {
        if config.mode == WidgetMode::Notes {
            nested
                .create(widget_config().with_mode(WidgetMode::Chat))
                .unwrap();
        }
    });

    let handle = ctl.create(widget_config()).unwrap();
    handle.update_props(ConfigPatch::new().with_mode(WidgetMode::Notes));

    assert_eq!(ctl.epoch(), 1);
    assert_eq!(ctl.page().count_with_id(CONTAINER_ID), 1);
    let (root, last) = journal.last_render().unwrap();
    assert_eq!(root, RootId(0));
    assert_eq!(last.mode, WidgetMode::Chat);
    assert_eq!(ctl.snapshot().map(|config| config.mode), Some(WidgetMode::Chat));

    // The hook holds a controller clone; drop it to break the cycle.
    ctl.renderer().clear_hook();
}

#[test]
fn create_from_inside_render_rebuilds_a_detached_container() {
    init_test_logging();
    let (ctl, journal) = test_controller();

    let nested = ctl.clone();
    ctl.renderer().on_render(move |config| {
        if config.mode == WidgetMode::Notes {
            if let Some(container) = nested.container() {
                nested.page().wipe_body();
                assert!(!nested.page().contains(&container));
            }
            nested
                .create(widget_config().with_mode(WidgetMode::Chat))
                .unwrap();
        }
    });

    let first = ctl.create(widget_config()).unwrap();
    first.update_props(ConfigPatch::new().with_mode(WidgetMode::Notes));

    assert_eq!(ctl.epoch(), 2);
    assert!(ctl.is_live());
    assert!(!first.is_current());
    assert_eq!(ctl.page().count_with_id(CONTAINER_ID), 1);
    // The root lent to the interrupted render is released exactly once.
    assert_eq!(journal.unmount_count(RootId(0)), 1);
    assert_eq!(journal.live_roots(), vec![RootId(1)]);
    let (root, last) = journal.last_render().unwrap();
    assert_eq!(root, RootId(1));
    assert_eq!(last.mode, WidgetMode::Chat);

    ctl.renderer().clear_hook();
}
