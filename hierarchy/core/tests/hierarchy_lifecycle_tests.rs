// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! End-to-end tests for the lifecycle hooks, driven through the simulated
//! host exactly the way a CI server would call them.
//!
//! Covers opt-in, linkage, one-hop propagation in both directions, abort
//! reason chaining, registry cleanup and concurrent notifications.

use std::sync::Arc;

use parking_lot::Mutex;

use hierarchy_killer_core::domain::config::KillerConfigManifest;
use hierarchy_killer_core::domain::events::{DeregistrationCause, HierarchyEvent};
use hierarchy_killer_core::domain::policy::{
    ENABLE_HIERARCHY_KILLER, KILL_DOWNSTREAM, KILL_UNSTABLE, KILL_UPSTREAM,
};
use hierarchy_killer_core::domain::error::HostError;
use hierarchy_killer_core::domain::run::{Cause, EnvVars, Run, RunId, RunResult, TaskListener};
use hierarchy_killer_core::infrastructure::simulation::{
    BufferedListener, SimulatedHost, SimulatedRun, SimulatedRunBuilder,
};
use hierarchy_killer_core::HierarchyKillerService;

fn host(cascade: bool) -> SimulatedHost {
    let service = Arc::new(HierarchyKillerService::new(KillerConfigManifest::default()));
    service.initialize();
    SimulatedHost::new(service, cascade)
}

fn governed(id: &str) -> SimulatedRunBuilder {
    SimulatedRun::builder(id).env(ENABLE_HIERARCHY_KILLER, "true")
}

fn id(value: &str) -> RunId {
    RunId::from(value)
}

/// A build that runs `hook` the first time it is interrupted, the way a host
/// can start new builds from inside an abort.
struct OnInterrupt {
    inner: SimulatedRun,
    hook: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl OnInterrupt {
    fn new(inner: SimulatedRun, hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner,
            hook: Mutex::new(Some(Box::new(hook))),
        }
    }
}

impl Run for OnInterrupt {
    fn id(&self) -> RunId {
        self.inner.id()
    }

    fn url(&self) -> String {
        self.inner.url()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn result(&self) -> Option<RunResult> {
        self.inner.result()
    }

    fn set_result(&self, result: RunResult) {
        self.inner.set_result(result)
    }

    fn interrupt(&self, result: RunResult) {
        self.inner.interrupt(result);
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn causes(&self) -> Vec<Cause> {
        self.inner.causes()
    }

    fn environment(&self, listener: &dyn TaskListener) -> Result<EnvVars, HostError> {
        self.inner.environment(listener)
    }
}

#[test]
fn test_scenario_failed_parent_aborts_child() {
    let host = host(false);
    let a = host.start(governed("job/a/1").env(KILL_DOWNSTREAM, "true").build());
    let b = host.start(governed("job/b/1").caused_by("job/a/1").build());
    let service = host.service().clone();

    host.complete(&a.id(), RunResult::Failure).unwrap();

    assert_eq!(b.result(), Some(RunResult::Aborted));
    assert_eq!(b.interrupts(), vec![RunResult::Aborted]);
    assert!(service
        .registry()
        .lookup(&b.id())
        .unwrap()
        .reason
        .contains("job/a/1/"));
    assert_eq!(service.stats().aborts, 1);
    assert!(!service.registry().contains(&a.id()));
}

#[test]
fn test_scenario_ungoverned_failure_is_silent() {
    let host = host(false);
    let mut events = host.service().subscribe();
    let c = host.start(SimulatedRun::builder("job/c/1").build());

    host.complete(&c.id(), RunResult::Failure).unwrap();

    assert!(events.drain().is_empty());
    assert_eq!(host.service().stats().aborts, 0);
    assert!(host.listener(&c.id()).unwrap().lines().is_empty());
}

#[test]
fn test_ungoverned_parent_is_not_linkable() {
    let host = host(false);
    let parent = host.start(SimulatedRun::builder("job/p/1").env(KILL_DOWNSTREAM, "true").build());
    let child = host.start(
        governed("job/c/1")
            .env(KILL_UPSTREAM, "true")
            .caused_by("job/p/1")
            .build(),
    );

    host.complete(&child.id(), RunResult::Failure).unwrap();
    host.complete(&parent.id(), RunResult::Failure).unwrap();

    assert!(parent.interrupts().is_empty());
    assert_eq!(host.service().stats().aborts, 0);
}

#[test]
fn test_single_removal_in_either_order() {
    let host = host(false);
    let registry = host.service().registry().clone();

    let first = host.start(governed("job/a/1").build());
    host.complete_without_finalize(&first.id(), RunResult::Success).unwrap();
    assert!(!registry.contains(&first.id()));
    host.finalize(&first.id()).unwrap();
    host.finalize(&first.id()).unwrap();

    let second = host.start(governed("job/b/1").build());
    host.finalize(&second.id()).unwrap();
    assert!(!registry.contains(&second.id()));
    host.complete_without_finalize(&second.id(), RunResult::Failure).unwrap();

    assert!(registry.is_empty());
}

#[test]
fn test_propagation_scope_skips_finalized_child() {
    let host = host(false);
    let parent = host.start(governed("job/p/1").env(KILL_DOWNSTREAM, "true").build());
    let first = host.start(governed("job/c/1").caused_by("job/p/1").build());
    let second = host.start(governed("job/c/2").caused_by("job/p/1").build());
    let finished = host.start(governed("job/c/3").caused_by("job/p/1").build());

    host.complete(&finished.id(), RunResult::Success).unwrap();
    host.complete(&parent.id(), RunResult::Failure).unwrap();

    assert_eq!(first.result(), Some(RunResult::Aborted));
    assert_eq!(second.result(), Some(RunResult::Aborted));
    assert_eq!(finished.result(), Some(RunResult::Success));
    assert!(finished.interrupts().is_empty());
    assert_eq!(host.service().stats().aborts, 2);
}

#[test]
fn test_unstable_only_kills_when_opted_in() {
    let host = host(false);
    let strict = host.start(governed("job/s/1").env(KILL_DOWNSTREAM, "true").build());
    let strict_child = host.start(governed("job/s-child/1").caused_by("job/s/1").build());
    let lenient = host.start(
        governed("job/l/1")
            .env(KILL_DOWNSTREAM, "true")
            .env(KILL_UNSTABLE, "true")
            .build(),
    );
    let lenient_child = host.start(governed("job/l-child/1").caused_by("job/l/1").build());

    host.complete(&strict.id(), RunResult::Unstable).unwrap();
    host.complete(&lenient.id(), RunResult::Unstable).unwrap();

    assert!(strict_child.is_active());
    assert_eq!(lenient_child.result(), Some(RunResult::Aborted));
}

#[test]
fn test_upstream_kill_reaches_parent_only() {
    let host = host(false);
    let root = host.start(governed("job/root/1").build());
    let parent = host.start(governed("job/parent/1").caused_by("job/root/1").build());
    let sibling = host.start(governed("job/sibling/1").caused_by("job/parent/1").build());
    let child = host.start(
        governed("job/child/1")
            .env(KILL_UPSTREAM, "true")
            .caused_by("job/parent/1")
            .build(),
    );

    host.complete(&child.id(), RunResult::Failure).unwrap();

    assert_eq!(parent.result(), Some(RunResult::Aborted));
    assert!(root.is_active());
    assert!(sibling.is_active());
    assert!(host
        .listener(&child.id())
        .unwrap()
        .contains("Aborted job/parent/1/"));
}

#[test]
fn test_cascade_chains_reasons_and_server_url() {
    let host = host(true);
    let base = "https://ci.example.com/";
    let a = host.start(
        governed("job/a/1")
            .env(KILL_DOWNSTREAM, "true")
            .env("JENKINS_URL", base)
            .build(),
    );
    let b = host.start(
        governed("job/b/1")
            .env(KILL_DOWNSTREAM, "true")
            .env("JENKINS_URL", base)
            .caused_by("job/a/1")
            .build(),
    );
    let c = host.start(governed("job/c/1").caused_by("job/b/1").build());

    assert!(host
        .listener(&a.id())
        .unwrap()
        .contains("Triggered: https://ci.example.com/job/b/1/"));

    host.complete(&a.id(), RunResult::Failure).unwrap();

    assert_eq!(b.result(), Some(RunResult::Aborted));
    assert_eq!(c.result(), Some(RunResult::Aborted));
    assert!(host.listener(&c.id()).unwrap().contains(
        "Aborted by HierarchyKiller, caused by https://ci.example.com/job/b/1/, caused by https://ci.example.com/job/a/1/"
    ));
    assert!(host.service().registry().is_empty());
}

#[test]
fn test_child_started_during_propagation_is_not_linked_to_trigger() {
    let service = Arc::new(HierarchyKillerService::new(KillerConfigManifest::default()));
    service.initialize();

    let a = Arc::new(governed("job/a/1").env(KILL_DOWNSTREAM, "true").build());
    let a_listener = Arc::new(BufferedListener::new());
    service.notify_run_started(a.clone(), a_listener.clone());

    // Aborting b makes the host start another child of a.
    let late = Arc::new(governed("job/late/1").caused_by("job/a/1").build());
    let hook = {
        let (service, late) = (service.clone(), late.clone());
        move || service.notify_run_started(late, Arc::new(BufferedListener::new()))
    };
    let b = Arc::new(OnInterrupt::new(
        governed("job/b/1").caused_by("job/a/1").build(),
        hook,
    ));
    service.notify_run_started(b.clone(), Arc::new(BufferedListener::new()));

    a.finish(RunResult::Failure);
    service.notify_run_completed(a.as_ref(), a_listener.as_ref());

    assert_eq!(b.inner.interrupts(), vec![RunResult::Aborted]);
    assert!(!service.registry().contains(&a.id()));

    let late_entry = service.registry().lookup(&late.id()).unwrap();
    assert_eq!(late_entry.upstream, None);
    assert!(!a_listener.contains("job/late/1"));
    assert!(late.is_active());
}

#[test]
fn test_without_cascade_aborts_stop_after_one_hop() {
    let host = host(false);
    let a = host.start(governed("job/a/1").env(KILL_DOWNSTREAM, "true").build());
    let b = host.start(
        governed("job/b/1")
            .env(KILL_DOWNSTREAM, "true")
            .caused_by("job/a/1")
            .build(),
    );
    let c = host.start(governed("job/c/1").caused_by("job/b/1").build());

    host.complete(&a.id(), RunResult::Failure).unwrap();

    assert_eq!(b.result(), Some(RunResult::Aborted));
    assert!(c.is_active());
}

#[test]
fn test_environment_failure_is_treated_as_ungoverned() {
    let host = host(false);
    let run = host.start(governed("job/a/1").environment_error("node offline").build());

    assert!(!host.service().registry().contains(&run.id()));
    assert!(host
        .listener(&run.id())
        .unwrap()
        .contains("Could not resolve environment: Environment resolution failed: node offline"));
}

#[test]
fn test_hooks_before_initialize_are_ignored() {
    let service = Arc::new(HierarchyKillerService::new(KillerConfigManifest::default()));
    let host = SimulatedHost::new(service.clone(), false);

    let run = host.start(governed("job/a/1").build());

    assert!(service.registry().is_empty());
    assert!(host
        .listener(&run.id())
        .unwrap()
        .contains("not yet initialized"));
}

#[test]
fn test_concurrent_triggers_abort_shared_victim_once() {
    let host = host(false);
    let a = host.start(governed("job/a/1").env(KILL_DOWNSTREAM, "true").build());
    let b = host.start(governed("job/b/1").caused_by("job/a/1").build());
    let d = host.start(
        governed("job/d/1")
            .env(KILL_UPSTREAM, "true")
            .caused_by("job/b/1")
            .build(),
    );

    std::thread::scope(|scope| {
        let host = &host;
        let (a_id, d_id) = (a.id(), d.id());
        scope.spawn(move || host.complete_without_finalize(&a_id, RunResult::Failure).unwrap());
        scope.spawn(move || host.complete_without_finalize(&d_id, RunResult::Failure).unwrap());
    });

    assert_eq!(b.interrupts(), vec![RunResult::Aborted]);
    assert_eq!(host.service().stats().aborts, 1);
}

#[test]
fn test_concurrent_starts_link_every_child() {
    let host = host(false);
    let root = host.start(governed("job/root/1").env(KILL_DOWNSTREAM, "true").build());

    std::thread::scope(|scope| {
        for n in 0..16 {
            let host = &host;
            scope.spawn(move || {
                host.start(governed(&format!("job/leaf/{}", n)).caused_by("job/root/1").build());
            });
        }
    });

    assert_eq!(
        host.service().registry().lookup(&root.id()).unwrap().downstream.len(),
        16
    );
    host.complete(&root.id(), RunResult::Failure).unwrap();
    assert_eq!(host.service().stats().aborts, 16);
}

#[tokio::test]
async fn test_victim_event_sequence() {
    let host = host(false);
    let mut victim_events = host.service().event_bus().subscribe_run(id("job/b/1"));

    let a = host.start(governed("job/a/1").env(KILL_DOWNSTREAM, "true").build());
    host.start(governed("job/b/1").caused_by("job/a/1").build());
    host.complete(&a.id(), RunResult::Failure).unwrap();
    host.finalize(&id("job/b/1")).unwrap();

    assert!(matches!(
        victim_events.recv().await.unwrap(),
        HierarchyEvent::RunRegistered { .. }
    ));
    assert!(matches!(
        victim_events.recv().await.unwrap(),
        HierarchyEvent::RunLinked { upstream, .. } if upstream == id("job/a/1")
    ));
    assert!(matches!(
        victim_events.recv().await.unwrap(),
        HierarchyEvent::RunAborted { trigger, .. } if trigger == id("job/a/1")
    ));
    assert!(matches!(
        victim_events.recv().await.unwrap(),
        HierarchyEvent::RunDeregistered { cause: DeregistrationCause::Finalized, .. }
    ));
}
