//! # Process Relay
//!
//! Launch an external command detached from the caller and relay its
//! combined stdout/stderr as a cancellable, line-oriented event sequence
//! that ends in exactly one terminal event.
//!
//! ## Quick Start
//!
//! ```no_run
//! use process_relay::{ProcessRelay, RelayEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = ProcessRelay::new();
//!     let mut handle = relay.start("echo", ["hello"])?;
//!     let mut events = handle.take_events().expect("fresh handle");
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             RelayEvent::Output { line } => println!("{line}"),
//!             RelayEvent::Finished { completion } => println!("done: {completion}"),
//!             RelayEvent::Failed { message, .. } => eprintln!("failed: {message}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Channels
//!
//! On Unix the default channel is a named pipe. The command runs under
//! `/bin/sh -c` in its own process group with both streams redirected into
//! a freshly created FIFO, so it keeps running when the relay stops
//! watching. [`RelayHandle::stop`] cancels the read loop and writes a wake
//! line into the FIFO to unblock a pending read.
//!
//! Elsewhere, or when [`ChannelKind::Piped`] is selected, the command is
//! spawned directly with piped stdout/stderr. This fallback is degraded:
//! the child is not detached from the relay's pipes, output of the two
//! streams interleaves per line rather than per write, and the child may be
//! killed by a broken pipe once nobody reads its output.
//!
//! ## Managing many relays
//!
//! [`RelayManager`] buffers output of concurrently running relays, pages
//! through it, and answers "what is still running" for shutdown prompts.
//!
//! ## Error Handling
//!
//! Setup errors are returned as [`RelayError`]. Everything that goes wrong
//! after `start` returns is reported once, as a `Failed` terminal event:
//!
//! ```no_run
//! # use process_relay::{ProcessRelay, RelayEvent, FailureKind};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut handle = ProcessRelay::new().start("/nonexistent/binary", Vec::<String>::new())?;
//! let transcript = handle.take_events().expect("fresh handle").collect().await;
//! assert!(transcript.lines.is_empty());
//! assert!(matches!(
//!     transcript.terminal,
//!     Some(RelayEvent::Failed { kind: FailureKind::Spawn, .. })
//! ));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod channel;
pub mod error;
pub mod manager;
pub mod relay;
pub mod types;

pub use error::{RelayError, Result};
pub use manager::RelayManager;
pub use relay::{ProcessRelay, RelayEvents, RelayHandle, RelayTranscript};
pub use types::events::{Completion, FAILURE_EXIT_CODE, FailureKind, RelayEvent, RelayFailure};
pub use types::identifiers::RelayId;
pub use types::manager::{ListRelaysResponse, RelayOutput, RelaySummary, StartRelayRequest};
pub use types::options::{ArgumentMode, ChannelKind, RelayOptions, RelayOptionsBuilder};
pub use types::state::RelayState;

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
