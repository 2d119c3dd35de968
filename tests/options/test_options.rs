//! Tests for `RelayOptions` configuration

use std::collections::HashMap;
use std::path::PathBuf;

use process_relay::types::options::{
    DEFAULT_MAX_LINE_BYTES, DEFAULT_SHELL, ENV_CHANNEL, ENV_MAX_LINE_BYTES, ENV_PIPE_DIR, ENV_SHELL,
};
use process_relay::{ArgumentMode, ChannelKind, RelayError, RelayOptions};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let options = RelayOptions::default();
    assert_eq!(options.shell, PathBuf::from(DEFAULT_SHELL));
    assert_eq!(options.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    assert_eq!(options.argument_mode, ArgumentMode::Quoted);
    assert!(!options.echo_errors);
    assert!(options.pipe_path.is_none());
    #[cfg(unix)]
    assert_eq!(options.channel, ChannelKind::NamedPipe);
    assert!(options.validate().is_ok());
}

#[test]
fn test_builder() {
    let options = RelayOptions::builder()
        .channel(ChannelKind::Piped)
        .pipe_dir("/var/tmp")
        .shell("/bin/bash")
        .cwd("/srv")
        .env("GAME_MODE", "dedicated")
        .argument_mode(ArgumentMode::Raw)
        .max_line_bytes(512)
        .name_attempts(4)
        .echo_errors(true)
        .build();

    assert_eq!(options.channel, ChannelKind::Piped);
    assert_eq!(options.resolved_pipe_dir(), PathBuf::from("/var/tmp"));
    assert_eq!(options.shell, PathBuf::from("/bin/bash"));
    assert_eq!(options.cwd, Some(PathBuf::from("/srv")));
    assert_eq!(options.env.get("GAME_MODE").map(String::as_str), Some("dedicated"));
    assert_eq!(options.argument_mode, ArgumentMode::Raw);
    assert_eq!(options.max_line_bytes, 512);
    assert_eq!(options.name_attempts, 4);
    assert!(options.echo_errors);
}

#[test]
#[should_panic(expected = "max_line_bytes must be > 0")]
fn test_builder_rejects_zero_line_limit() {
    let _ = RelayOptions::builder().max_line_bytes(0);
}

#[test]
fn test_pipe_dir_defaults_to_temp_dir() {
    assert_eq!(RelayOptions::default().resolved_pipe_dir(), std::env::temp_dir());
}

#[test]
fn test_from_lookup_overlays_values() {
    let options = RelayOptions::from_lookup(lookup(&[
        (ENV_CHANNEL, "piped"),
        (ENV_PIPE_DIR, "/run/relay"),
        (ENV_SHELL, "/bin/dash"),
        (ENV_MAX_LINE_BYTES, " 4096 "),
    ]))
    .unwrap();

    assert_eq!(options.channel, ChannelKind::Piped);
    assert_eq!(options.pipe_dir, Some(PathBuf::from("/run/relay")));
    assert_eq!(options.shell, PathBuf::from("/bin/dash"));
    assert_eq!(options.max_line_bytes, 4096);
}

#[test]
fn test_from_lookup_ignores_empty_paths() {
    let options =
        RelayOptions::from_lookup(lookup(&[(ENV_PIPE_DIR, ""), (ENV_SHELL, "")])).unwrap();
    assert!(options.pipe_dir.is_none());
    assert_eq!(options.shell, PathBuf::from(DEFAULT_SHELL));
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    let err = RelayOptions::from_lookup(lookup(&[(ENV_CHANNEL, "carrier-pigeon")])).unwrap_err();
    assert!(matches!(err, RelayError::InvalidConfig(_)));

    let err = RelayOptions::from_lookup(lookup(&[(ENV_MAX_LINE_BYTES, "lots")])).unwrap_err();
    assert!(err.to_string().contains(ENV_MAX_LINE_BYTES));

    let err = RelayOptions::from_lookup(lookup(&[(ENV_MAX_LINE_BYTES, "0")])).unwrap_err();
    assert!(matches!(err, RelayError::InvalidConfig(_)));
}

#[test]
fn test_channel_kind_parsing() {
    assert_eq!("fifo".parse::<ChannelKind>().unwrap(), ChannelKind::NamedPipe);
    assert_eq!("Named-Pipe".parse::<ChannelKind>().unwrap(), ChannelKind::NamedPipe);
    assert_eq!(" piped ".parse::<ChannelKind>().unwrap(), ChannelKind::Piped);
    assert_eq!("pipe".parse::<ChannelKind>().unwrap(), ChannelKind::Piped);
    assert!("socket".parse::<ChannelKind>().is_err());

    for kind in [ChannelKind::NamedPipe, ChannelKind::Piped] {
        assert_eq!(kind.as_str().parse::<ChannelKind>().unwrap(), kind);
    }
}
