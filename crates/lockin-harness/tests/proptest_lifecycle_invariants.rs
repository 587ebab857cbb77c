//! Property-based invariant tests for the singleton controller.
//!
//! Random sequences of lifecycle calls and host-page interference are run
//! against a controller and a plain model of the expected state:
//!
//! 1. At most one attached container carries the well-known identifier.
//! 2. The last render always equals the model snapshot in full.
//! 3. Container identity is stable unless the container was detached or the
//!    widget unmounted.
//! 4. After `unmount` nothing is attached and no root is live.
//! 5. At most one rendering root is live at any time.

use lockin_core::{CONTAINER_ID, ConfigPatch, HostPage, PageContext, WidgetConfig, WidgetMode};
use lockin_harness::{NodeId, TestController, test_controller, widget_config};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Create { open: bool, mode: WidgetMode },
    Update(PatchPlan),
    Unmount,
    WipeBody,
    RemoveContainer,
}

#[derive(Debug, Clone)]
struct PatchPlan {
    open: Option<bool>,
    mode: Option<WidgetMode>,
    text: Option<Option<String>>,
    context: Option<Option<String>>,
}

impl PatchPlan {
    fn to_patch(&self) -> ConfigPatch {
        let mut patch = ConfigPatch::new();
        if let Some(open) = self.open {
            patch = patch.with_open(open);
        }
        if let Some(mode) = self.mode {
            patch = patch.with_mode(mode);
        }
        if let Some(text) = &self.text {
            patch = patch.with_selected_text(text.clone());
        }
        if let Some(url) = &self.context {
            patch = patch.with_page_context(url.as_ref().map(|u| PageContext::new(u.clone(), "t")));
        }
        patch
    }
}

fn mode_strategy() -> impl Strategy<Value = WidgetMode> {
    prop_oneof![
        Just(WidgetMode::Read),
        Just(WidgetMode::Chat),
        Just(WidgetMode::Notes),
    ]
}

fn patch_strategy() -> impl Strategy<Value = PatchPlan> {
    (
        proptest::option::of(any::<bool>()),
        proptest::option::of(mode_strategy()),
        proptest::option::of(proptest::option::of("[a-z]{0,8}")),
        proptest::option::of(proptest::option::of("https://[a-z]{1,6}\\.test")),
    )
        .prop_map(|(open, mode, text, context)| PatchPlan {
            open,
            mode,
            text,
            context,
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<bool>(), mode_strategy()).prop_map(|(open, mode)| Op::Create { open, mode }),
        4 => patch_strategy().prop_map(Op::Update),
        1 => Just(Op::Unmount),
        1 => Just(Op::WipeBody),
        1 => Just(Op::RemoveContainer),
    ]
}

// ── Model ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Model {
    snapshot: Option<WidgetConfig>,
    container: Option<NodeId>,
}

fn run(ops: &[Op]) -> Result<(), TestCaseError> {
    let (ctl, journal): (TestController, _) = test_controller();
    let mut model = Model::default();
    let mut handle = None;

    for op in ops {
        match op {
            Op::Create { open, mode } => {
                let cfg = widget_config().with_open(*open).with_mode(*mode);
                let was_live = ctl.is_live();
                let h = ctl.create(cfg.clone()).expect("in-memory backends never fail");
                if was_live {
                    prop_assert_eq!(Some(*h.container()), model.container);
                } else {
                    prop_assert_ne!(Some(*h.container()), model.container);
                }
                model.container = Some(*h.container());
                model.snapshot = Some(cfg);
                handle = Some(h);
            }
            Op::Update(plan) => {
                let Some(h) = &handle else { continue };
                let outcome = h.update_props(plan.to_patch());
                match model.snapshot.take() {
                    Some(snapshot) => {
                        prop_assert!(outcome.is_applied());
                        model.snapshot = Some(snapshot.merge(plan.to_patch()));
                    }
                    None => prop_assert!(!outcome.is_applied()),
                }
            }
            Op::Unmount => {
                if let Some(h) = &handle {
                    h.unmount();
                    model.snapshot = None;
                    model.container = None;
                }
            }
            Op::WipeBody => ctl.page().wipe_body(),
            Op::RemoveContainer => {
                if let Some(node) = ctl.container() {
                    ctl.page().remove(&node).expect("memory page remove");
                }
            }
        }

        // Invariant 1
        prop_assert!(ctl.page().count_with_id(CONTAINER_ID) <= 1);
        // Invariant 5
        prop_assert!(journal.live_roots().len() <= 1);

        // Invariant 2
        prop_assert_eq!(ctl.snapshot(), model.snapshot.clone());
        if let Some(snapshot) = &model.snapshot {
            let (_, last) = journal.last_render().expect("a render happened");
            prop_assert_eq!(&last, snapshot);
        }

        // Invariant 4
        if model.container.is_none() {
            prop_assert!(!ctl.is_live());
            prop_assert!(journal.live_roots().is_empty());
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn lifecycle_sequences_hold_invariants(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        run(&ops)?;
    }

    #[test]
    fn create_after_any_sequence_yields_exactly_one_container(
        ops in proptest::collection::vec(op_strategy(), 0..30),
        mode in mode_strategy(),
    ) {
        let (ctl, _journal) = test_controller();
        for op in &ops {
            match op {
                Op::WipeBody => ctl.page().wipe_body(),
                _ => {
                    ctl.create(widget_config().with_mode(mode)).expect("create");
                }
            }
        }
        ctl.create(widget_config().with_mode(mode)).expect("create");
        prop_assert_eq!(ctl.page().count_with_id(CONTAINER_ID), 1);
        prop_assert!(ctl.is_live());
    }
}
