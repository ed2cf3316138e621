#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` against a scripted client.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{Failure, HEATER, ScriptedClient, house, raw};
use cozytouch_core::{
    Coordinator, CoordinatorConfig, CoreError, IntegrationConfig, RefreshError, RefreshState,
    StateKey, setup,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        poll_interval: Duration::from_secs(3600),
        refresh_timeout: Duration::from_secs(5),
        max_backoff: None,
    }
}

fn coordinator(client: &Arc<ScriptedClient>) -> Coordinator {
    Coordinator::new(client.clone(), config())
}

fn heater_mode(c: &Coordinator) -> Option<String> {
    c.data()?
        .device(HEATER)?
        .state_str(StateKey::OperatingMode)
        .map(ToOwned::to_owned)
}

async fn wait_for_state(c: &Coordinator, want: RefreshState) {
    let mut rx = c.watch_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
        .await
        .expect("state not reached")
        .unwrap();
}

// ── Snapshots ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_no_snapshot_before_first_refresh() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);

    assert!(c.data().is_none());
    assert!(c.last_error().is_none());
    assert_eq!(c.state(), RefreshState::Idle);
    assert_eq!(client.fetches(), 0);
}

#[tokio::test]
async fn test_refresh_swaps_whole_snapshot() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);

    let first = c.first_refresh().await.unwrap();
    client.set_setup(house("standby"));
    let second = c.refresh().await.unwrap();

    // Earlier readers keep a consistent view of the old tree.
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(
        first.device(HEATER).unwrap().state_str(StateKey::OperatingMode),
        Some("basic")
    );
    assert_eq!(heater_mode(&c).as_deref(), Some("standby"));
    assert!(Arc::ptr_eq(&c.data().unwrap(), &second));
}

#[tokio::test]
async fn test_listeners_run_after_swap_once_per_success() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = {
        let calls = calls.clone();
        let observer = c.clone();
        c.add_listener(move |tree| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert!(Arc::ptr_eq(&observer.data().unwrap(), tree));
        })
    };

    c.first_refresh().await.unwrap();
    client.fail_next(Failure::Network);
    assert!(c.refresh().await.is_err());
    c.refresh().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(c.remove_listener(seen));
    c.refresh().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_yields_published_snapshots() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);
    let mut stream = c.subscribe().into_stream();

    c.first_refresh().await.unwrap();
    let tree = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&tree, &c.data().unwrap()));

    // A failed refresh publishes nothing; the next success does.
    client.fail_next(Failure::Network);
    assert!(c.refresh().await.is_err());
    client.set_setup(house("standby"));
    c.refresh().await.unwrap();

    let tree = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        tree.device(HEATER).unwrap().state_str(StateKey::OperatingMode),
        Some("standby")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_snapshot() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);
    c.first_refresh().await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let c = c.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut reads = 0usize;
                while !stop.load(Ordering::SeqCst) {
                    let tree = c.data().unwrap();
                    let views = [
                        tree.heaters(),
                        tree.water_heaters(),
                        tree.boilers(),
                        tree.sensors(),
                        tree.gateways(),
                    ];
                    let mut in_views = 0;
                    for device in views.into_iter().flatten() {
                        assert!(Arc::ptr_eq(device, tree.device(&device.id).unwrap()));
                        in_views += 1;
                    }
                    assert_eq!(in_views, tree.len());
                    let mode = tree.device(HEATER).unwrap().state_str(StateKey::OperatingMode);
                    assert!(matches!(mode, Some("basic" | "standby")), "got {mode:?}");
                    reads += 1;
                    tokio::task::yield_now().await;
                }
                reads
            })
        })
        .collect();

    for round in 0..10 {
        let before = c.data().unwrap();
        client.set_setup(house(if round % 2 == 0 { "standby" } else { "basic" }));
        client.hold_next();
        let refresh = {
            let c = c.clone();
            tokio::spawn(async move { c.refresh().await })
        };
        client.entered().await;
        // Mid-fetch, readers still get the previous snapshot.
        assert!(Arc::ptr_eq(&c.data().unwrap(), &before));
        client.release();
        let after = refresh.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&c.data().unwrap(), &after));
    }

    stop.store(true, Ordering::SeqCst);
    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }
    assert_eq!(heater_mode(&c).as_deref(), Some("basic"));
}

#[tokio::test]
async fn test_malformed_nodes_skipped() {
    let client = Arc::new(ScriptedClient::new(raw(json!({
        "devices": [
            { "deviceURL": "io://1", "uiWidget": "AtlanticElectricalHeater", "label": "A" },
            { "deviceURL": "io://2", "uiWidget": "AtlanticElectricalHeater", "label": "B" },
            { "uiWidget": "AtlanticElectricalHeater", "label": "no id" },
            { "deviceURL": "io://3", "uiWidget": "TemperatureSensor", "label": "C" },
            { "deviceURL": "io://4", "uiWidget": "ContactSensor", "label": "D" }
        ]
    }))));
    let c = coordinator(&client);

    let tree = c.first_refresh().await.unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.diagnostics().len(), 1);
    assert!(c.last_error().is_none());
}

// ── Scheduling ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_refreshes_never_overlap() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    client.set_delay(Duration::from_millis(20));
    let c = coordinator(&client);

    let runs: Vec<_> = (0..5)
        .map(|_| {
            let c = c.clone();
            tokio::spawn(async move { c.refresh().await })
        })
        .collect();
    for run in runs {
        run.await.unwrap().unwrap();
    }

    assert_eq!(client.fetches(), 5);
    assert_eq!(client.max_in_flight(), 1);
}

#[tokio::test]
async fn test_refresh_requests_coalesce() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);
    c.first_refresh().await.unwrap();
    c.start().await;

    let mut snapshots = c.subscribe();
    client.hold_next();
    c.request_refresh();
    client.entered().await;

    // A burst while a refresh is in flight yields exactly one more.
    for _ in 0..10 {
        c.request_refresh();
    }
    client.release();

    tokio::time::timeout(Duration::from_secs(5), async {
        while client.fetches() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(client.fetches(), 3);
    assert_eq!(client.max_in_flight(), 1);
    c.shutdown().await;
}

#[tokio::test]
async fn test_refresh_timeout_is_network_failure() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = Coordinator::new(
        client.clone(),
        CoordinatorConfig {
            refresh_timeout: Duration::from_millis(50),
            ..config()
        },
    );
    client.set_delay(Duration::from_secs(2));

    let err = c.refresh().await.unwrap_err();
    assert!(matches!(err, RefreshError::Network { .. }), "got {err:?}");
    assert_eq!(c.state(), RefreshState::Failed);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_throttle_keeps_snapshot_then_recovers() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);
    let a = c.first_refresh().await.unwrap();

    client.fail_next(Failure::Throttled(Some(30)));
    let err = c.refresh().await.unwrap_err();
    assert!(err.is_throttled());

    // Failed refresh leaves the previous snapshot installed.
    assert!(Arc::ptr_eq(&c.data().unwrap(), &a));
    assert_eq!(c.last_error(), Some(err));
    assert_eq!(c.state(), RefreshState::Failed);
    assert!(!c.requires_reauth());

    client.set_setup(house("standby"));
    c.refresh().await.unwrap();
    assert!(c.last_error().is_none());
    assert_eq!(c.state(), RefreshState::Idle);
    assert_eq!(heater_mode(&c).as_deref(), Some("standby"));
}

#[tokio::test]
async fn test_auth_failure_at_setup() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    client.fail_next(Failure::Auth);

    let result = setup(client.clone(), IntegrationConfig::default()).await;
    assert!(
        matches!(result, Err(CoreError::AuthFailure { .. })),
        "expected AuthFailure"
    );
}

#[tokio::test]
async fn test_network_failure_at_setup() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    client.fail_next(Failure::Network);

    let result = setup(client.clone(), IntegrationConfig::default()).await;
    assert!(matches!(result, Err(CoreError::UpdateFailed { .. })));
}

#[tokio::test]
async fn test_auth_failure_halts_worker() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let c = coordinator(&client);
    c.first_refresh().await.unwrap();
    c.start().await;

    client.fail_next(Failure::Auth);
    c.request_refresh();
    wait_for_state(&c, RefreshState::Failed).await;
    assert!(c.requires_reauth());
    assert!(c.last_error().unwrap().is_auth());
    let fetches = client.fetches();

    c.request_refresh();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.fetches(), fetches);
    c.shutdown().await;
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_teardown_discards_in_flight_refresh() {
    let client = Arc::new(ScriptedClient::new(house("basic")));
    let integration = setup(client.clone(), IntegrationConfig::default())
        .await
        .unwrap();
    let c = integration.coordinator().clone();

    client.hold_next();
    client.set_setup(house("standby"));
    c.request_refresh();
    client.entered().await;

    let teardown = tokio::spawn(integration.teardown());
    tokio::task::yield_now().await;
    client.release();
    teardown.await.unwrap();

    assert!(c.is_shut_down());
    assert_eq!(heater_mode(&c).as_deref(), Some("basic"));
    assert!(matches!(c.first_refresh().await, Err(CoreError::Stopped)));
}
