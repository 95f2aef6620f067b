//! Exclusive resource leases as observed through dispatch.

mod common;

use std::sync::Arc;

use rstest::rstest;
use trellis_core::{ContentVisitor, Fragment, LeaseConflict, PhaseSet, VisitContext, VisitResult};
use trellis_runtime::tree::elem;
use trellis_runtime::{BindingConfig, DispatchError, Engine};

use common::{EventLog, event_log, events};

/// Acquires `resource` in the after phase and logs the outcome. When
/// `acquire_twice` is set it attempts a second acquisition while still
/// holding the first, which must conflict.
struct Acquirer {
    name: &'static str,
    resource: &'static str,
    acquire_twice: bool,
    log: EventLog,
}

impl Acquirer {
    fn new(name: &'static str, resource: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self { name, resource, acquire_twice: false, log: Arc::clone(log) })
    }

    fn double(name: &'static str, resource: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self { name, resource, acquire_twice: true, log: Arc::clone(log) })
    }
}

impl ContentVisitor for Acquirer {
    fn visit_after(&self, _f: &dyn Fragment, ctx: &mut VisitContext<'_>) -> VisitResult {
        let _lease = ctx.acquire(self.resource)?;
        self.log.lock().unwrap().push(format!("{}:acquired", self.name));
        if self.acquire_twice {
            ctx.acquire(self.resource)?;
        }
        Ok(())
    }
}

#[rstest]
fn second_acquisition_of_a_held_lease_fails_the_visitor() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "order",
            Acquirer::double("greedy", "writer", &log),
            BindingConfig::new().phases(PhaseSet::AFTER),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    let err = engine.traverse(&elem("order").build()).unwrap_err();
    match err {
        DispatchError::Visitor { binding, source, .. } => {
            assert_eq!(binding, "order");
            let conflict = source.into_inner().downcast::<LeaseConflict>().unwrap();
            assert_eq!(&*conflict.resource, "writer");
        }
        other => panic!("expected visitor error, got {other:?}"),
    }
    assert_eq!(events(&log), vec!["greedy:acquired"]);
}

#[rstest]
fn leases_are_reclaimed_between_callbacks() {
    // Two bindings on the same fragment want the same resource. Because the
    // driver closes the lease scope after every callback, the second
    // acquisition succeeds, in dependency order.
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "order",
            Acquirer::new("second", "writer", &log),
            BindingConfig::new()
                .named("second")
                .consumes(["total"])
                .phases(PhaseSet::AFTER),
        )
        .unwrap();
    builder
        .register(
            "order",
            Acquirer::new("first", "writer", &log),
            BindingConfig::new()
                .named("first")
                .produces(["total"])
                .phases(PhaseSet::AFTER),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    engine.traverse(&elem("order").build()).unwrap();
    assert_eq!(events(&log), vec!["first:acquired", "second:acquired"]);
}

#[rstest]
fn distinct_occurrences_never_contend() {
    let log = event_log();
    let mut builder = Engine::builder();
    builder
        .register(
            "item",
            Acquirer::new("per-item", "writer", &log),
            BindingConfig::new().phases(PhaseSet::AFTER),
        )
        .unwrap();
    let engine = builder.build().unwrap();

    let doc = elem("order").child(elem("item")).child(elem("item")).build();
    engine.traverse(&doc).unwrap();
    assert_eq!(events(&log).len(), 2);
}

#[rstest]
fn explicit_release_frees_the_resource_within_a_callback() {
    struct ReleaseThenRetry;
    impl ContentVisitor for ReleaseThenRetry {
        fn visit_after(&self, _f: &dyn Fragment, ctx: &mut VisitContext<'_>) -> VisitResult {
            let lease = ctx.acquire("writer")?;
            ctx.release(lease);
            ctx.acquire("writer")?;
            Ok(())
        }
    }

    let mut builder = Engine::builder();
    builder
        .register("order", Arc::new(ReleaseThenRetry), BindingConfig::new().phases(PhaseSet::AFTER))
        .unwrap();
    let engine = builder.build().unwrap();
    engine.traverse(&elem("order").build()).unwrap();
}
