//! Calls against a live machine server over loopback TCP.

use std::sync::Arc;
use std::time::Duration;

use fleet_net::{MachineMapClient, NetError, StatusCode};
use fleet_server::MachineMapService;
use fleet_sim::{MachineId, MachineStore, SimConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(20);

struct Harness {
    client: MachineMapClient,
    store: Arc<MachineStore>,
    shutdown: CancellationToken,
}

async fn start() -> Harness {
    let config = SimConfig::default().with_tick_interval(TICK);
    let store = Arc::new(MachineStore::new(config.seed));
    let service = MachineMapService::new(Arc::clone(&store), config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(fleet_server::serve(listener, service, shutdown.clone()));

    let client = MachineMapClient::connect(addr.to_string()).await.unwrap();
    Harness {
        client,
        store,
        shutdown,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(TICK).await;
    }
    condition()
}

#[tokio::test]
async fn test_stream_delivers_states_for_a_new_machine() {
    let harness = start().await;
    let mut stream = harness.client.stream().await.unwrap();

    let first = stream.message().await.unwrap().unwrap();
    assert_eq!(first.id, 0);
    assert_eq!(first.fuel_level, 100.0);
    assert!(first.is_paused);

    let second = stream.message().await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert!(harness.store.contains(MachineId(first.id)));

    harness.shutdown.cancel();
}

#[tokio::test]
async fn test_dropping_the_stream_removes_the_machine() {
    let harness = start().await;
    let mut stream = harness.client.stream().await.unwrap();
    let id = MachineId(stream.message().await.unwrap().unwrap().id);
    assert!(harness.store.contains(id));

    drop(stream);
    let store = Arc::clone(&harness.store);
    assert!(wait_until(|| !store.contains(id)).await);

    harness.shutdown.cancel();
}

#[tokio::test]
async fn test_pause_and_unpause_return_updated_state() {
    let harness = start().await;
    let mut stream = harness.client.stream().await.unwrap();
    let id = stream.message().await.unwrap().unwrap().id;

    let running = harness.client.unpause(id).await.unwrap();
    assert_eq!(running.id, id);
    assert!(!running.is_paused);

    let paused = harness.client.pause(id).await.unwrap();
    assert!(paused.is_paused);

    harness.shutdown.cancel();
}

#[tokio::test]
async fn test_control_calls_on_unknown_machine_are_not_found() {
    let harness = start().await;

    for result in [
        harness.client.pause(404).await,
        harness.client.unpause(404).await,
    ] {
        match result {
            Err(NetError::Status(status)) => assert_eq!(status.code, StatusCode::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    harness.shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let harness = start().await;
    let mut stream = harness.client.stream().await.unwrap();
    stream.message().await.unwrap().unwrap();

    harness.shutdown.cancel();

    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match stream.message().await {
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    let store = Arc::clone(&harness.store);
    assert!(wait_until(|| store.is_empty()).await);
}

#[tokio::test]
async fn test_connect_fails_without_a_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(matches!(
        MachineMapClient::connect(addr.to_string()).await,
        Err(NetError::Io(_))
    ));
}
