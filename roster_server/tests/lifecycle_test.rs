mod test_utils;

use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex, atomic::Ordering},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use roster_app::{
    lifecycle::Setup,
    test_utils::tests::{EndpointBehavior, MockEndpoint, MockStoreConnection, RecordingSetup},
};
use roster_server::{App, Phase, PhaseError};

use crate::test_utils::tests::{SHUTDOWN, SlowSetup, app_with, memory_app, wait_for_phase};

#[tokio::test]
async fn test_boot_failure_skips_serving_but_disconnects() {
    let store = Arc::new(MockStoreConnection::unreachable());
    let endpoint = MockEndpoint::new(EndpointBehavior::Graceful);
    let served = endpoint.served();
    let app = app_with(store.clone(), vec![], endpoint);
    let phase = app.phase();

    let errors = app.run(CancellationToken::new()).await.unwrap_err();

    assert_eq!(errors.errors().len(), 1);
    assert!(matches!(errors.errors()[0], PhaseError::Connect(_)));
    assert_eq!(errors.errors()[0].phase(), Phase::Booting);
    assert_eq!(served.load(Ordering::SeqCst), 0);
    assert_eq!(store.disconnect_count(), 1);
    assert_eq!(*phase.borrow(), Phase::Stopped);
}

#[tokio::test]
async fn test_setups_run_in_order_and_stop_at_first_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let setups: Vec<Arc<dyn Setup>> = vec![
        Arc::new(RecordingSetup::new("schema", log.clone())),
        Arc::new(RecordingSetup::failing("index", log.clone())),
        Arc::new(RecordingSetup::new("seed", log.clone())),
    ];
    let store = Arc::new(MockStoreConnection::new());
    let app = app_with(
        store.clone(),
        setups,
        MockEndpoint::new(EndpointBehavior::Graceful),
    );

    let errors = app.run(CancellationToken::new()).await.unwrap_err();

    assert_eq!(*log.lock().unwrap(), vec!["schema", "index"]);
    assert!(matches!(
        errors.errors(),
        [PhaseError::Setup { index: 1, .. }]
    ));
    assert!(errors.to_string().starts_with("boot: setup[1]"));
    assert_eq!(store.disconnect_count(), 1);
}

#[tokio::test]
async fn test_slow_boot_hits_startup_timeout() {
    let store = Arc::new(MockStoreConnection::new());
    let setups: Vec<Arc<dyn Setup>> = vec![Arc::new(SlowSetup(Duration::from_secs(10)))];
    let endpoint = MockEndpoint::new(EndpointBehavior::Graceful);
    let served = endpoint.served();
    let app = App::new(
        Duration::from_millis(50),
        SHUTDOWN,
        store.clone(),
        setups,
        Box::new(endpoint),
    );

    let errors = app.run(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        errors.errors(),
        [PhaseError::StartupTimeout(after)] if *after == Duration::from_millis(50)
    ));
    assert_eq!(served.load(Ordering::SeqCst), 0);
    assert_eq!(store.disconnect_count(), 1);
}

#[tokio::test]
async fn test_cancellation_is_a_clean_stop() {
    let store = Arc::new(MockStoreConnection::new());
    let endpoint = MockEndpoint::new(EndpointBehavior::Graceful);
    let served = endpoint.served();
    let app = app_with(store.clone(), vec![], endpoint);
    let mut phase = app.phase();
    let cancel = CancellationToken::new();

    let running = tokio::spawn(app.run(cancel.clone()));
    wait_for_phase(&mut phase, Phase::Running).await;
    cancel.cancel();

    let outcome = running.await.expect("run task panicked");

    assert!(outcome.is_ok(), "unexpected errors: {outcome:?}");
    assert_eq!(served.load(Ordering::SeqCst), 1);
    assert_eq!(store.disconnect_count(), 1);
    assert_eq!(*phase.borrow(), Phase::Stopped);
}

#[tokio::test]
async fn test_serving_failure_ends_run_and_shuts_down() {
    let store = Arc::new(MockStoreConnection::new());
    let app = app_with(
        store.clone(),
        vec![],
        MockEndpoint::new(EndpointBehavior::FailAfter(Duration::from_millis(20))),
    );

    let errors = app.run(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(errors.errors(), [PhaseError::Run(_)]));
    assert_eq!(errors.errors()[0].phase(), Phase::Running);
    assert_eq!(store.disconnect_count(), 1);
}

#[tokio::test]
async fn test_failure_after_cancellation_is_reported_by_shutdown() {
    let store = Arc::new(MockStoreConnection::new());
    let app = app_with(
        store.clone(),
        vec![],
        MockEndpoint::new(EndpointBehavior::FailOnClose),
    );
    let mut phase = app.phase();
    let cancel = CancellationToken::new();

    let running = tokio::spawn(app.run(cancel.clone()));
    wait_for_phase(&mut phase, Phase::Running).await;
    cancel.cancel();

    let errors = tokio::time::timeout(SHUTDOWN * 2, running)
        .await
        .expect("run should finish within the shutdown budget")
        .expect("run task panicked")
        .unwrap_err();

    assert!(matches!(errors.errors(), [PhaseError::ShutdownServer(_)]));
    assert!(errors.to_string().contains("drain failed"));
    assert_eq!(store.disconnect_count(), 1);
}

#[tokio::test]
async fn test_shutdown_collects_every_failure() {
    let store = Arc::new(MockStoreConnection::failing_disconnect());
    let app = app_with(
        store.clone(),
        vec![],
        MockEndpoint::new(EndpointBehavior::Stuck),
    );
    let mut phase = app.phase();
    let cancel = CancellationToken::new();

    let running = tokio::spawn(app.run(cancel.clone()));
    wait_for_phase(&mut phase, Phase::Running).await;
    cancel.cancel();

    let errors = running.await.expect("run task panicked").unwrap_err();

    assert!(matches!(
        errors.errors(),
        [
            PhaseError::ShutdownTimeout { what: "server", .. },
            PhaseError::Disconnect(_)
        ]
    ));
    assert!(
        errors
            .errors()
            .iter()
            .all(|e| e.phase() == Phase::ShuttingDown)
    );
    assert_eq!(errors.to_string().lines().count(), 2);
}

#[tokio::test]
async fn test_serves_players_over_http() {
    let app = memory_app().await.expect("app should build");
    let addr = app.addr().expect("bound address");
    let mut phase = app.phase();
    let cancel = CancellationToken::new();

    let running = tokio::spawn(app.run(cancel.clone()));
    wait_for_phase(&mut phase, Phase::Running).await;

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let res = client
        .post(format!("{base}/players"))
        .json(&json!({ "email": "a@x.com", "name": "Ann" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    let id = created["player"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{base}/players/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let read: Value = res.json().await.unwrap();
    assert_eq!(read["player"], created["player"]);

    let res = client
        .get(format!("{base}/players/filter?email=a@x.com"))
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);

    cancel.cancel();
    let outcome = running.await.expect("run task panicked");
    assert!(outcome.is_ok(), "unexpected errors: {outcome:?}");
}
