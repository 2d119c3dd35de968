//! Integration tests for `RelayManager`

use std::time::Duration;

use futures::StreamExt;
use process_relay::{
    ChannelKind, Completion, RelayError, RelayId, RelayManager, RelayOptions, RelayState,
    StartRelayRequest,
};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const RUN_TIMEOUT: Duration = Duration::from_secs(15);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn manager(dir: &TempDir) -> RelayManager {
    let channel = if cfg!(unix) {
        ChannelKind::NamedPipe
    } else {
        ChannelKind::Piped
    };
    RelayManager::new(
        RelayOptions::builder()
            .channel(channel)
            .pipe_dir(dir.path())
            .build(),
    )
}

fn request(label: &str, command: &str, arguments: &[&str]) -> StartRelayRequest {
    StartRelayRequest {
        label: label.to_string(),
        command: command.to_string(),
        arguments: arguments.iter().map(ToString::to_string).collect(),
    }
}

/// Wait until the collector has retired the relay
async fn wait_completed(manager: &RelayManager, id: &RelayId) {
    timeout(RUN_TIMEOUT, async {
        loop {
            if let Ok(output) = manager.get_output(id, 0, 0).await
                && output.is_complete
                && !manager.is_running(id).await
            {
                let listing = manager.list(true, 0).await.unwrap();
                if listing
                    .relays
                    .iter()
                    .any(|relay| &relay.relay_id == id && relay.completed_at.is_some())
                {
                    return;
                }
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("relay should complete");
}

#[tokio::test]
async fn test_start_and_page_output() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let id = manager
        .start_relay(request("counter", "seq", &["1", "10"]))
        .await
        .unwrap();
    wait_completed(&manager, &id).await;

    let page = manager.get_output(&id, 2, 3).await.unwrap();
    assert_eq!(page.lines, vec!["3", "4", "5"]);
    assert_eq!(page.total_lines, 10);
    assert_eq!(page.lines_returned, 3);
    assert!(page.has_more);
    assert!(page.is_complete);
    assert_eq!(page.label, "counter");
    assert_eq!(
        page.state,
        RelayState::Finished {
            completion: Completion::Exited(0)
        }
    );

    let tail = manager.get_output(&id, -2, 100).await.unwrap();
    assert_eq!(tail.lines, vec!["9", "10"]);
    assert!(!tail.has_more);
}

#[tokio::test]
async fn test_unknown_relay_is_not_found() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let id = RelayId::new("missing");

    assert!(matches!(
        manager.get_output(&id, 0, 10).await,
        Err(RelayError::RelayNotFound(_))
    ));
    assert!(matches!(
        manager.stop_relay(&id).await,
        Err(RelayError::RelayNotFound(_))
    ));
    assert!(matches!(
        manager.terminate_relay(&id).await,
        Err(RelayError::RelayNotFound(_))
    ));
    assert!(manager.get_relay_info(&id).await.is_err());
}

#[tokio::test]
async fn test_failed_launch_is_reported_in_state() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let id = manager
        .start_relay(request("broken", "/nonexistent/binary", &[]))
        .await
        .unwrap();
    wait_completed(&manager, &id).await;

    let output = manager.get_output(&id, 0, 10).await.unwrap();
    assert!(output.lines.is_empty());
    assert!(matches!(output.state, RelayState::Failed { .. }));
}

#[tokio::test]
async fn test_running_labels_and_stop() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let long = manager
        .start_relay(request("server", "sleep", &["30"]))
        .await
        .unwrap();
    let short = manager
        .start_relay(request("quick", "true", &[]))
        .await
        .unwrap();
    wait_completed(&manager, &short).await;

    timeout(RUN_TIMEOUT, async {
        while !manager.is_running(&long).await {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(manager.running_labels().await, vec!["server"]);

    let listing = manager.list(true, 3).await.unwrap();
    assert_eq!(listing.total_active, 1);
    assert_eq!(listing.total_completed, 1);
    assert_eq!(listing.relays[0].label, "server");

    let state = manager.stop_relay(&long).await.unwrap();
    assert!(matches!(
        state,
        RelayState::StopRequested
            | RelayState::Finished {
                completion: Completion::Detached
            }
    ));

    let final_state = timeout(RUN_TIMEOUT, manager.wait_relay(&long))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        final_state,
        RelayState::Finished {
            completion: Completion::Detached
        }
    );
    wait_completed(&manager, &long).await;
    assert!(manager.running_labels().await.is_empty());

    // Stopping a completed relay reports its final state
    assert_eq!(manager.stop_relay(&long).await.unwrap(), final_state);
}

#[tokio::test]
async fn test_follow_streams_live_lines() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let id = manager
        .start_relay(request(
            "ticker",
            "sh",
            &["-c", "sleep 1; echo a; echo b; echo c"],
        ))
        .await
        .unwrap();

    let stream = manager.follow(&id).await.unwrap();
    let lines: Vec<String> = timeout(RUN_TIMEOUT, stream.collect()).await.unwrap();
    assert_eq!(lines, vec!["a", "b", "c"]);

    wait_completed(&manager, &id).await;
    assert!(matches!(
        manager.follow(&id).await,
        Err(RelayError::RelayComplete(_))
    ));

    let info = manager.get_relay_info(&id).await.unwrap();
    assert_eq!(info.line_count, 3);
    assert_eq!(info.last_output, vec!["a", "b", "c"]);
    assert_eq!(info.command, "sh");
}

#[tokio::test]
async fn test_shutdown_stops_everything() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let first = manager
        .start_relay(request("one", "sleep", &["30"]))
        .await
        .unwrap();
    let second = manager
        .start_relay(request("two", "sleep", &["30"]))
        .await
        .unwrap();

    manager.shutdown().await.unwrap();

    for id in [&first, &second] {
        let state = timeout(RUN_TIMEOUT, manager.wait_relay(id))
            .await
            .unwrap()
            .unwrap();
        assert!(state.is_terminal());
    }
}
