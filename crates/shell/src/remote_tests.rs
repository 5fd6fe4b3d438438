// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_session_records_lines_in_order() {
    let session = FakeSession::new("build-box");
    session.run_line("echo one", &HashMap::new()).await.expect("line 1");
    session.run_line("echo two", &HashMap::new()).await.expect("line 2");
    assert_eq!(*session.log.lock(), vec!["echo one", "echo two"]);
}

#[tokio::test]
async fn fake_session_fails_on_configured_line() {
    let session = FakeSession::new("build-box").failing_on("boom");
    let err = session.run_line("boom", &HashMap::new()).await.unwrap_err();
    assert!(matches!(err, RemoteError::ExecFailed { code: 1, .. }));
}

#[tokio::test]
async fn fake_dialer_returns_a_working_session() {
    let dialer = FakeDialer::new();
    let auth = RemoteAuth::default();
    let session = dialer
        .dial("build-box", &auth, Arc::new(TrustAllKnownHosts))
        .await
        .expect("dial");
    session.run_line("echo hi", &HashMap::new()).await.expect("run");
}

#[tokio::test]
async fn fake_dialer_configured_to_fail_propagates_to_every_session() {
    let dialer = FakeDialer::failing_on("deploy");
    let auth = RemoteAuth::default();
    let session = dialer
        .dial("build-box", &auth, Arc::new(TrustAllKnownHosts))
        .await
        .expect("dial");
    let err = session.run_line("deploy", &HashMap::new()).await.unwrap_err();
    assert!(matches!(err, RemoteError::ExecFailed { code: 1, .. }));
}

#[tokio::test]
async fn host_semaphore_limits_concurrent_permits() {
    let sem = HostSemaphore::new(2);
    let p1 = sem.acquire().await;
    let p2 = sem.acquire().await;
    let sem2 = sem.clone();
    let acquired_third = tokio::time::timeout(std::time::Duration::from_millis(50), sem2.acquire()).await;
    assert!(acquired_third.is_err(), "third permit should not be available yet");
    drop(p1);
    let p3 = tokio::time::timeout(std::time::Duration::from_millis(50), sem.acquire())
        .await
        .expect("permit released");
    drop(p2);
    drop(p3);
}
