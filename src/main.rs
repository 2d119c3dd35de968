//! process-relay
//!
//! Runs a command through a relay and prints its output line by line,
//! followed by the terminal event. Exits with the command's exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use process_relay::{
    ArgumentMode, ChannelKind, Completion, ProcessRelay, RelayEvent, RelayOptions,
};

/// Exit code base for signal deaths, as reported by shells
const SIGNAL_EXIT_BASE: i32 = 128;

#[derive(Parser, Debug)]
#[command(name = "process-relay")]
#[command(version, about = "Run a command and relay its combined output")]
struct Args {
    /// Channel backend (fifo or piped). Overrides PROCESS_RELAY_CHANNEL.
    #[arg(long)]
    channel: Option<ChannelKind>,

    /// Directory for the named pipe. Overrides PROCESS_RELAY_PIPE_DIR.
    #[arg(long)]
    pipe_dir: Option<PathBuf>,

    /// Shell running the composite command. Overrides PROCESS_RELAY_SHELL.
    #[arg(long)]
    shell: Option<PathBuf>,

    /// Working directory for the command.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Pass arguments to the shell unquoted.
    #[arg(long)]
    raw_args: bool,

    /// Also print failure text as an output line.
    #[arg(long)]
    echo_errors: bool,

    /// Stop watching after this many seconds; the command keeps running.
    #[arg(long, value_name = "SECS")]
    stop_after: Option<f64>,

    /// Kill the command after this many seconds.
    #[arg(long, value_name = "SECS")]
    terminate_after: Option<f64>,

    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,

    /// Command and its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Args {
    fn options(&self) -> Result<RelayOptions> {
        let mut options = RelayOptions::from_env().context("invalid relay environment")?;

        if let Some(channel) = self.channel {
            options.channel = channel;
        }
        if let Some(ref dir) = self.pipe_dir {
            options.pipe_dir = Some(dir.clone());
        }
        if let Some(ref shell) = self.shell {
            options.shell = shell.clone();
        }
        if let Some(ref cwd) = self.cwd {
            options.cwd = Some(cwd.clone());
        }
        if self.raw_args {
            options.argument_mode = ArgumentMode::Raw;
        }
        options.echo_errors = self.echo_errors;

        Ok(options)
    }
}

fn seconds(value: Option<f64>, flag: &str) -> Result<Option<Duration>> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs).with_context(|| format!("invalid --{flag}: {secs}"))
        })
        .transpose()
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

fn exit_code(event: &RelayEvent) -> i32 {
    match event {
        RelayEvent::Finished {
            completion: Completion::Signaled(signal),
        } => SIGNAL_EXIT_BASE + signal,
        RelayEvent::Finished {
            completion: Completion::Detached,
        } => 0,
        other => other.exit_indicator().unwrap_or(0),
    }
}

fn print_event(event: &RelayEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        RelayEvent::Output { line } => println!("{line}"),
        RelayEvent::Finished { completion } => log::info!("process {completion}"),
        RelayEvent::Failed { kind, message } => eprintln!("relay failed ({kind:?}): {message}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let options = args.options()?;
    let stop_after = seconds(args.stop_after, "stop-after")?;
    let terminate_after = seconds(args.terminate_after, "terminate-after")?;

    let (program, arguments) = args
        .command
        .split_first()
        .context("no command given")?;

    let mut handle = ProcessRelay::with_options(options)
        .start(program.clone(), arguments.to_vec())
        .context("failed to start relay")?;
    let mut events = handle
        .take_events()
        .context("relay events already taken")?;

    let stop_timer = sleep_for(stop_after);
    let terminate_timer = sleep_for(terminate_after);
    tokio::pin!(stop_timer, terminate_timer);
    let mut stop_armed = stop_after.is_some();
    let mut terminate_armed = terminate_after.is_some();

    let mut code = 0;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, args.json)?;
                if event.is_terminal() {
                    code = exit_code(&event);
                }
            }
            () = &mut stop_timer, if stop_armed => {
                stop_armed = false;
                log::info!("stopping relay {}", handle.id());
                handle.stop();
            }
            () = &mut terminate_timer, if terminate_armed => {
                terminate_armed = false;
                log::info!("terminating relay {}", handle.id());
                if let Err(e) = handle.terminate() {
                    log::warn!("terminate failed: {e}");
                }
            }
        }
    }

    Ok(ExitCode::from(u8::try_from(code & 0xff).unwrap_or(1)))
}
