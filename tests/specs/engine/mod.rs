// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mst_core::{CommandScript, CommandSettings, Dep, DuplicatePolicy, Maestro};
use mst_engine::{prepare, ExecContext, RemoteRuntime};
use mst_shell::{FakeDialer, SharedSink, TrustAllKnownHosts};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()).expect("utf8")
    }
}

fn local_cmd(name: &str, lines: &[&str]) -> CommandSettings {
    let mut cmd = CommandSettings::new(name);
    cmd.script = lines.iter().map(|l| CommandScript::plain(*l)).collect();
    cmd
}

#[tokio::test]
async fn a_three_level_dependency_graph_runs_in_topological_order() {
    let mut maestro = Maestro::new(DuplicatePolicy::Replace);
    maestro.registry.register(local_cmd("fetch", &["echo fetch"])).expect("register fetch");
    let mut build = local_cmd("build", &["echo build"]);
    build.deps.push(Dep::new("fetch"));
    maestro.registry.register(build).expect("register build");
    let mut test = local_cmd("test", &["echo test"]);
    test.deps.push(Dep::new("build"));
    maestro.registry.register(test).expect("register test");

    let remote = RemoteRuntime {
        dialer: Arc::new(FakeDialer::new()),
        known_hosts: Arc::new(TrustAllKnownHosts),
    };
    let prepared = prepare(&maestro, "test", &[], false, &remote).expect("prepare");

    let out = Capture::default();
    let ctx = ExecContext::new(SharedSink::new(out.clone()), SharedSink::new(out.clone()));
    prepared.execute(&ctx).await.expect("execute");

    let text = out.text();
    let fetch_at = text.find("fetch").expect("fetch ran");
    let build_at = text.find("build").expect("build ran");
    let test_at = text.find("test").expect("test ran");
    assert!(fetch_at < build_at && build_at < test_at);
}

#[tokio::test]
async fn a_shared_dependency_runs_exactly_once() {
    let mut maestro = Maestro::new(DuplicatePolicy::Replace);
    maestro.registry.register(local_cmd("shared", &["echo shared"])).expect("register shared");
    let mut left = local_cmd("left", &["echo left"]);
    left.deps.push(Dep::new("shared"));
    maestro.registry.register(left).expect("register left");
    let mut right = local_cmd("right", &["echo right"]);
    right.deps.push(Dep::new("shared"));
    maestro.registry.register(right).expect("register right");
    let mut top = local_cmd("top", &["echo top"]);
    top.deps.push(Dep::new("left"));
    top.deps.push(Dep::new("right"));
    maestro.registry.register(top).expect("register top");

    let remote = RemoteRuntime {
        dialer: Arc::new(FakeDialer::new()),
        known_hosts: Arc::new(TrustAllKnownHosts),
    };
    let prepared = prepare(&maestro, "top", &[], false, &remote).expect("prepare");

    let out = Capture::default();
    let ctx = ExecContext::new(SharedSink::new(out.clone()), SharedSink::new(out.clone()));
    prepared.execute(&ctx).await.expect("execute");

    assert_eq!(out.text().matches("shared").count(), 1);
}
