//! Depth gating relative to the shallowest live matched root.

mod common;

use rstest::rstest;
use trellis_core::PhaseSet;
use trellis_runtime::tree::elem;
use trellis_runtime::{BindingConfig, Engine};

use common::{Recorder, event_log, events};

#[rstest]
fn fragments_deeper_than_the_limit_are_skipped() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "order/**",
            Recorder::new("shallow", &log),
            BindingConfig::new().max_depth(1).phases(PhaseSet::BEFORE),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    let doc = elem("order")
        .child(elem("items").child(elem("item").child(elem("price"))))
        .build();
    engine.traverse(&doc).unwrap();

    assert_eq!(events(&log), vec!["shallow:before:order", "shallow:before:items"]);
}

#[rstest]
fn depth_is_measured_from_the_matched_root_not_the_document() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "item/**",
            Recorder::new("r", &log),
            BindingConfig::new().max_depth(1).phases(PhaseSet::BEFORE),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    // item sits at document depth 3; its child price must still be within
    // the limit because gating is relative to item.
    let doc = elem("order")
        .child(elem("items").child(elem("item").child(elem("price").child(elem("currency")))))
        .build();
    engine.traverse(&doc).unwrap();

    assert_eq!(events(&log), vec!["r:before:item", "r:before:price"]);
}

#[rstest]
fn nested_matched_roots_gate_against_the_shallowest() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "section/**",
            Recorder::new("r", &log),
            BindingConfig::new().max_depth(1).phases(PhaseSet::BEFORE),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    // the inner section matches again, but it does not reset the depth
    // budget of the outer occurrence.
    let doc = elem("section")
        .child(elem("section").child(elem("p")))
        .build();
    engine.traverse(&doc).unwrap();

    assert_eq!(events(&log), vec!["r:before:section", "r:before:section"]);
}

#[rstest]
fn budget_resets_once_the_matched_root_closes() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "item/**",
            Recorder::new("r", &log),
            BindingConfig::new().max_depth(1).phases(PhaseSet::BEFORE),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    let doc = elem("order")
        .child(elem("item").child(elem("price").child(elem("deep"))))
        .child(elem("item").child(elem("price")))
        .build();
    engine.traverse(&doc).unwrap();

    assert_eq!(
        events(&log),
        vec!["r:before:item", "r:before:price", "r:before:item", "r:before:price"]
    );
}

#[rstest]
fn unlimited_bindings_see_every_match() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "order/**",
            Recorder::new("all", &log),
            BindingConfig::new().phases(PhaseSet::BEFORE),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    let doc = elem("order")
        .child(elem("items").child(elem("item").child(elem("price"))))
        .build();
    engine.traverse(&doc).unwrap();
    assert_eq!(events(&log).len(), 4);
}
