// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mst_core::CommandScript;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration as StdDuration;

#[derive(Clone, Default)]
struct Capture(Arc<StdMutex<Vec<u8>>>);

impl std::io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn text(capture: &Capture) -> String {
    String::from_utf8(capture.0.lock().unwrap_or_else(|e| e.into_inner()).clone()).expect("utf8")
}

fn ctx_with(capture: &Capture) -> ExecContext {
    let sink = SharedSink::new(capture.clone());
    ExecContext::new(sink.clone(), sink)
}

fn local(name: &str, lines: &[&str]) -> LocalExecuter {
    LocalExecuter {
        name: name.to_string(),
        env: mst_core::Environment::new(),
        workdir: std::env::temp_dir(),
        exported_env: HashMap::new(),
        script: lines.iter().map(|l| CommandScript::plain(*l)).collect(),
        ignore_errors: false,
        timeout: None,
    }
}

fn command(name: &str, lines: &[&str], deps: Vec<PreparedDep>) -> PreparedCommand {
    PreparedCommand {
        name: name.to_string(),
        deps,
        body: Executer::Local(Box::new(local(name, lines))),
    }
}

#[tokio::test]
async fn local_executer_runs_script_lines_in_order() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let exec = local("build", &["echo one", "echo two"]);
    exec.run(&ctx).await.expect("run");
    assert_eq!(text(&capture), "[build] one\n[build] two\n");
}

#[tokio::test]
async fn failing_line_stops_the_script() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let exec = local("build", &["sh -c 'exit 3'", "echo unreached"]);
    let err = exec.run(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Process(_)));
    assert_eq!(text(&capture), "");
}

#[tokio::test]
async fn ignore_errors_suppresses_a_failing_script() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let mut exec = local("build", &["sh -c 'exit 3'"]);
    exec.ignore_errors = true;
    exec.run(&ctx).await.expect("swallowed");
}

#[tokio::test]
async fn timeout_kills_a_long_running_command() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let mut exec = local("slow", &["sleep 5"]);
    exec.timeout = Some(StdDuration::from_millis(50));
    let err = exec.run(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Timeout { name, .. } if name == "slow"));
}

#[tokio::test]
async fn shared_dependency_referenced_from_two_commands_runs_once() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let shared = Arc::new(command("shared", &["echo once-only"], Vec::new()));

    let first = command(
        "a",
        &["echo a"],
        vec![PreparedDep {
            name: "shared".to_string(),
            executer: shared.clone(),
            background: false,
            optional: false,
        }],
    );
    let second = command(
        "b",
        &["echo b"],
        vec![PreparedDep {
            name: "shared".to_string(),
            executer: shared,
            background: false,
            optional: false,
        }],
    );

    first.execute(&ctx).await.expect("a");
    second.execute(&ctx).await.expect("b");

    let output = text(&capture);
    assert_eq!(output.matches("once-only").count(), 1);
}

#[tokio::test]
async fn dependency_listed_twice_in_one_invocation_runs_once() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let shared = Arc::new(command("shared", &["echo once-only"], Vec::new()));

    let top = command(
        "top",
        &["echo top"],
        vec![
            PreparedDep {
                name: "shared".to_string(),
                executer: shared.clone(),
                background: false,
                optional: false,
            },
            PreparedDep {
                name: "shared".to_string(),
                executer: shared,
                background: true,
                optional: false,
            },
        ],
    );

    top.execute(&ctx).await.expect("top");
    assert_eq!(text(&capture).matches("once-only").count(), 1);
}

#[tokio::test]
async fn foreground_and_background_deps_both_precede_the_parent_script() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let fast = Arc::new(command("fast", &["echo fast"], Vec::new()));
    let slow = Arc::new(command("slow", &["sh -c 'sleep 0.05; echo slow'"], Vec::new()));

    let top = command(
        "top",
        &["echo top"],
        vec![
            PreparedDep {
                name: "slow".to_string(),
                executer: slow,
                background: true,
                optional: false,
            },
            PreparedDep {
                name: "fast".to_string(),
                executer: fast,
                background: false,
                optional: false,
            },
        ],
    );

    top.execute(&ctx).await.expect("top");
    let output = text(&capture);
    let top_pos = output.find("top").expect("top present");
    let slow_pos = output.find("slow").expect("slow present");
    let fast_pos = output.find("fast").expect("fast present");
    assert!(slow_pos < top_pos);
    assert!(fast_pos < top_pos);
}

#[tokio::test]
async fn failing_required_dependency_stops_the_parent_from_running() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let broken = Arc::new(command("broken", &["sh -c 'exit 1'"], Vec::new()));
    let top = command(
        "top",
        &["echo top"],
        vec![PreparedDep {
            name: "broken".to_string(),
            executer: broken,
            background: false,
            optional: false,
        }],
    );
    let err = top.execute(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Process(_)));
    assert!(!text(&capture).contains("top"));
}

#[tokio::test]
async fn failing_optional_dependency_does_not_stop_the_parent() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let broken = Arc::new(command("broken", &["sh -c 'exit 1'"], Vec::new()));
    let top = command(
        "top",
        &["echo top"],
        vec![PreparedDep {
            name: "broken".to_string(),
            executer: broken,
            background: false,
            optional: true,
        }],
    );
    top.execute(&ctx).await.expect("optional failure swallowed");
    assert!(text(&capture).contains("top"));
}

#[tokio::test]
async fn retry_gives_up_after_exhausting_attempts() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let inner = Executer::Local(Box::new(local("flaky", &["sh -c 'exit 1'"])));
    let retrying = Executer::Retry {
        inner: Box::new(inner),
        attempts: 3,
    };
    let err = retrying.execute(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Process(_)));
}

#[tokio::test]
async fn retry_of_zero_attempts_still_runs_once() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let inner = Executer::Local(Box::new(local("once", &["echo hi"])));
    let retrying = Executer::Retry {
        inner: Box::new(inner),
        attempts: 0,
    };
    retrying.execute(&ctx).await.expect("runs once");
    assert_eq!(text(&capture), "[once] hi\n");
}

#[tokio::test]
async fn sequence_set_runs_all_members_and_fails_on_first_error() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let members = vec![
        Arc::new(Executer::Local(Box::new(local("ok", &["echo ok"])))),
        Arc::new(Executer::Local(Box::new(local("bad", &["sh -c 'exit 1'"])))),
    ];
    let set = Executer::SequenceSet {
        members,
        max_concurrency: None,
    };
    let err = set.execute(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Process(_)));
    assert!(text(&capture).contains("ok"));
}

#[tokio::test]
async fn trace_writes_start_and_done_lines_on_success() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let inner = Executer::Local(Box::new(local("build", &["echo hi"])));
    let traced = Executer::Trace {
        inner: Box::new(inner),
        name: "build".to_string(),
    };
    traced.execute(&ctx).await.expect("run");
    let output = text(&capture);
    assert!(output.contains("[build] start"));
    assert!(output.contains("[build] done in"));
}

#[tokio::test]
async fn trace_writes_failed_line_on_error() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let inner = Executer::Local(Box::new(local("build", &["sh -c 'exit 1'"])));
    let traced = Executer::Trace {
        inner: Box::new(inner),
        name: "build".to_string(),
    };
    let err = traced.execute(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Process(_)));
    assert!(text(&capture).contains("[build] failed:"));
}

#[tokio::test]
async fn echo_modifier_writes_the_resolved_line_before_running_it() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let mut exec = local("build", &[]);
    exec.script = vec![CommandScript {
        modifiers: mst_core::ScriptModifiers {
            echo: true,
            ..Default::default()
        },
        line: "echo hi".to_string(),
    }];
    exec.run(&ctx).await.expect("run");
    assert_eq!(text(&capture), "[build] echo hi\n[build] hi\n");
}

#[tokio::test]
async fn invert_exit_turns_a_successful_line_into_a_failure() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let mut exec = local("build", &[]);
    exec.script = vec![CommandScript {
        modifiers: mst_core::ScriptModifiers {
            invert_exit: true,
            ..Default::default()
        },
        line: "echo hi".to_string(),
    }];
    let err = exec.run(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Process(_)));
}

#[tokio::test]
async fn invert_exit_swallows_a_failing_line() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    let mut exec = local("build", &[]);
    exec.script = vec![CommandScript {
        modifiers: mst_core::ScriptModifiers {
            invert_exit: true,
            ..Default::default()
        },
        line: "sh -c 'exit 1'".to_string(),
    }];
    exec.run(&ctx).await.expect("inverted failure succeeds");
}

#[tokio::test]
async fn canceled_context_short_circuits_before_running() {
    let capture = Capture::default();
    let ctx = ctx_with(&capture);
    ctx.cancel.cancel();
    let exec = Executer::Local(Box::new(local("build", &["echo hi"])));
    let err = exec.execute(&ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Canceled));
    assert_eq!(text(&capture), "");
}
