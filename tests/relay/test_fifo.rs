//! Integration tests for the named pipe backend
//!
//! Every test runs real commands through `/bin/sh` and an isolated pipe
//! directory.

#![cfg(unix)]

use std::time::Duration;

use process_relay::{
    ArgumentMode, ChannelKind, Completion, FailureKind, ProcessRelay, RelayEvent, RelayHandle,
    RelayOptions, RelayState, RelayTranscript,
};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const RUN_TIMEOUT: Duration = Duration::from_secs(15);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fifo_options(dir: &TempDir) -> RelayOptions {
    RelayOptions::builder()
        .channel(ChannelKind::NamedPipe)
        .pipe_dir(dir.path())
        .build()
}

async fn run(relay: &ProcessRelay, command: &str, args: &[&str]) -> (RelayHandle, RelayTranscript) {
    let mut handle = relay
        .start(command, args.iter().copied())
        .expect("relay should start");
    let events = handle.take_events().expect("events available");
    let transcript = timeout(RUN_TIMEOUT, events.collect())
        .await
        .expect("relay should finish in time");
    (handle, transcript)
}

fn assert_finished(transcript: &RelayTranscript, expected: Completion) {
    match transcript.terminal {
        Some(RelayEvent::Finished { completion }) => assert_eq!(completion, expected),
        ref other => panic!("expected Finished({expected}), got {other:?}"),
    }
}

async fn wait_until_running(handle: &RelayHandle) {
    timeout(RUN_TIMEOUT, async {
        while !handle.is_running() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay should reach running");
}

#[tokio::test]
async fn test_echo_hello() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (handle, transcript) = run(&relay, "echo", &["hello"]).await;

    assert_eq!(transcript.lines, vec!["hello"]);
    assert_finished(&transcript, Completion::Exited(0));
    assert_eq!(
        handle.state(),
        RelayState::Finished {
            completion: Completion::Exited(0)
        }
    );
}

#[tokio::test]
async fn test_exit_code_is_preserved() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (_handle, transcript) = run(&relay, "sh", &["-c", "echo before; exit 3"]).await;

    assert_eq!(transcript.lines, vec!["before"]);
    assert_finished(&transcript, Completion::Exited(3));
    assert_eq!(
        transcript.terminal.as_ref().and_then(RelayEvent::exit_indicator),
        Some(3)
    );
}

#[tokio::test]
async fn test_no_output() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (_handle, transcript) = run(&relay, "true", &[]).await;

    assert!(transcript.lines.is_empty());
    assert_finished(&transcript, Completion::Exited(0));
}

#[tokio::test]
async fn test_lines_arrive_in_order() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (_handle, transcript) = run(&relay, "seq", &["1", "200"]).await;

    let expected: Vec<String> = (1..=200).map(|n| n.to_string()).collect();
    assert_eq!(transcript.lines, expected);
    assert_finished(&transcript, Completion::Exited(0));
}

#[tokio::test]
async fn test_stderr_is_merged() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (_handle, transcript) = run(&relay, "sh", &["-c", "echo out; echo err 1>&2; echo done"]).await;

    assert_eq!(transcript.lines, vec!["out", "err", "done"]);
}

#[tokio::test]
async fn test_nonexistent_binary_fails_without_output() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (handle, transcript) = run(&relay, "/nonexistent/binary", &[]).await;

    assert!(transcript.lines.is_empty());
    assert!(matches!(
        transcript.terminal,
        Some(RelayEvent::Failed {
            kind: FailureKind::Spawn,
            ..
        })
    ));
    assert!(matches!(handle.state(), RelayState::Failed { .. }));
    // Nothing left behind in the pipe directory
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_echo_errors_adds_a_line() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let options = RelayOptions::builder()
        .pipe_dir(dir.path())
        .echo_errors(true)
        .build();
    let relay = ProcessRelay::with_options(options);

    let (_handle, transcript) = run(&relay, "/nonexistent/binary", &[]).await;

    assert_eq!(transcript.lines.len(), 1);
    assert!(transcript.lines[0].contains("/nonexistent/binary"));
    match transcript.terminal {
        Some(RelayEvent::Failed { ref message, .. }) => assert_eq!(message, &transcript.lines[0]),
        ref other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_existing_regular_file_is_not_used_as_pipe() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let occupied = dir.path().join("occupied");
    std::fs::write(&occupied, "keep me").unwrap();
    let marker = dir.path().join("marker");

    let options = RelayOptions::builder().pipe_path(&occupied).build();
    let relay = ProcessRelay::with_options(options);
    let marker_arg = marker.to_string_lossy().into_owned();

    let (_handle, transcript) = run(&relay, "touch", &[marker_arg.as_str()]).await;

    assert!(transcript.lines.is_empty());
    assert!(matches!(
        transcript.terminal,
        Some(RelayEvent::Failed {
            kind: FailureKind::Spawn,
            ..
        })
    ));
    assert!(!marker.exists(), "command must never run");
    assert_eq!(std::fs::read_to_string(&occupied).unwrap(), "keep me");
}

#[tokio::test]
async fn test_pipe_removed_after_finish() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (handle, transcript) = run(&relay, "echo", &["bye"]).await;

    assert_finished(&transcript, Completion::Exited(0));
    let pipe = handle.pipe_path().expect("named pipe relay has a path");
    assert!(pipe.starts_with(dir.path()));
    assert!(!pipe.exists());
}

#[tokio::test]
async fn test_stop_mid_stream() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let mut handle = relay
        .start(
            "sh",
            ["-c", "i=1; while [ $i -le 10 ]; do echo $i; i=$((i+1)); sleep 1; done"],
        )
        .unwrap();
    let events = handle.take_events().unwrap();
    let collector = tokio::spawn(events.collect());

    sleep(Duration::from_millis(2500)).await;
    handle.stop();

    let transcript = timeout(RUN_TIMEOUT, collector)
        .await
        .expect("stop should end the relay promptly")
        .unwrap();

    assert!(transcript.lines.len() <= 3, "got {:?}", transcript.lines);
    assert!(!transcript.lines.iter().any(|line| line == "Closing"));
    assert_finished(&transcript, Completion::Detached);
    assert_eq!(
        handle.state(),
        RelayState::Finished {
            completion: Completion::Detached
        }
    );
}

#[tokio::test]
async fn test_stop_after_finish_is_noop() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (handle, transcript) = run(&relay, "echo", &["hello"]).await;
    assert_finished(&transcript, Completion::Exited(0));

    handle.stop();
    handle.stop();

    assert_eq!(
        handle.state(),
        RelayState::Finished {
            completion: Completion::Exited(0)
        }
    );
    assert!(!handle.cancellation_token().is_cancelled());
}

#[tokio::test]
async fn test_terminate_kills_process_group() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let mut handle = relay.start("sleep", ["30"]).unwrap();
    let events = handle.take_events().unwrap();
    wait_until_running(&handle).await;

    handle.terminate().unwrap();
    let transcript = timeout(Duration::from_secs(10), events.collect())
        .await
        .expect("terminated relay should finish");

    match transcript.terminal {
        Some(RelayEvent::Finished { completion }) => {
            assert!(!completion.success());
            assert_ne!(completion, Completion::Detached);
        }
        ref other => panic!("expected Finished, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wait_returns_terminal_state() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let handle = relay.start("sh", ["-c", "exit 7"]).unwrap();
    let state = timeout(RUN_TIMEOUT, handle.wait()).await.unwrap();

    assert_eq!(
        state,
        RelayState::Finished {
            completion: Completion::Exited(7)
        }
    );
}

#[tokio::test]
async fn test_arguments_are_quoted() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let (_handle, transcript) = run(&relay, "echo", &["a  b", "$HOME", ";", "it's"]).await;

    assert_eq!(transcript.lines, vec!["a  b $HOME ; it's"]);
}

#[tokio::test]
async fn test_raw_arguments_reach_the_shell() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let options = RelayOptions::builder()
        .pipe_dir(dir.path())
        .argument_mode(ArgumentMode::Raw)
        .build();
    let relay = ProcessRelay::with_options(options);

    let (_handle, transcript) = run(&relay, "echo", &["$((1+2))"]).await;

    assert_eq!(transcript.lines, vec!["3"]);
}

#[tokio::test]
async fn test_long_lines_are_split() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let options = RelayOptions::builder()
        .pipe_dir(dir.path())
        .max_line_bytes(4)
        .build();
    let relay = ProcessRelay::with_options(options);

    let (_handle, transcript) = run(&relay, "echo", &["abcdefghij"]).await;

    assert_eq!(transcript.lines, vec!["abcd", "efgh", "ij"]);
}

#[tokio::test]
async fn test_cwd_and_env_apply_to_child() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let options = RelayOptions::builder()
        .pipe_dir(dir.path())
        .cwd(workdir.path())
        .env("RELAY_TEST_VALUE", "42")
        .build();
    let relay = ProcessRelay::with_options(options);

    let (_handle, transcript) = run(&relay, "sh", &["-c", "pwd -P; echo $RELAY_TEST_VALUE"]).await;

    let expected_dir = workdir.path().canonicalize().unwrap();
    assert_eq!(
        transcript.lines,
        vec![expected_dir.to_string_lossy().into_owned(), "42".to_string()]
    );
}

#[tokio::test]
async fn test_events_as_stream() {
    use futures::StreamExt;

    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    let mut handle = relay.start("printf", ["one\\ntwo\\n"]).unwrap();
    let stream = handle.take_events().unwrap();
    let all: Vec<RelayEvent> = timeout(RUN_TIMEOUT, StreamExt::collect::<Vec<_>>(stream))
        .await
        .unwrap();

    let lines: Vec<&str> = all.iter().filter_map(RelayEvent::line).collect();
    assert_eq!(lines, vec!["one", "two"]);
    assert_eq!(all.iter().filter(|event| event.is_terminal()).count(), 1);
    assert!(all.last().is_some_and(RelayEvent::is_terminal));
    assert!(handle.take_events().is_none());
}

#[tokio::test]
async fn test_shell_exiting_before_redirect_still_finishes() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let options = RelayOptions::builder()
        .pipe_dir(dir.path())
        .shell("/bin/true")
        .build();
    let relay = ProcessRelay::with_options(options);

    let mut collectors = Vec::new();
    for _ in 0..50 {
        let mut handle = relay.start("echo", ["never"]).unwrap();
        let events = handle.take_events().unwrap();
        collectors.push((handle, tokio::spawn(events.collect())));
    }

    for (handle, collector) in collectors {
        let transcript = timeout(Duration::from_secs(5), collector)
            .await
            .expect("relay must not hang when the shell never opens the pipe")
            .unwrap();
        assert!(transcript.lines.is_empty());
        assert_finished(&transcript, Completion::Exited(0));
        assert!(handle.is_terminal());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_stop_after_output_closed_detaches() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let relay = ProcessRelay::with_options(fifo_options(&dir));

    // Closes its output right away, then keeps running
    let mut handle = relay
        .start("sh", ["-c", "echo last; exec >&- 2>&-; sleep 5"])
        .unwrap();
    let events = handle.take_events().unwrap();
    let collector = tokio::spawn(events.collect());

    sleep(Duration::from_millis(500)).await;
    let pipe = handle.pipe_path().unwrap().to_path_buf();
    assert!(!pipe.exists(), "pipe is gone once the output is closed");
    handle.stop();

    let transcript = timeout(Duration::from_secs(2), collector)
        .await
        .expect("stop during the exit wait should end the relay")
        .unwrap();
    assert_eq!(transcript.lines, vec!["last"]);
    assert_finished(&transcript, Completion::Detached);
}
