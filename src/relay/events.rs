//! Consumer side of a relay's event sequence

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::types::events::RelayEvent;

/// Event sequence of one relay
///
/// Yields output lines in write order and ends after the terminal event.
/// Usable as a [`Stream`], from async code via [`recv`](Self::recv), from a
/// UI loop via [`try_recv`](Self::try_recv), or from a plain thread via
/// [`blocking_recv`](Self::blocking_recv).
#[derive(Debug)]
pub struct RelayEvents {
    rx: mpsc::UnboundedReceiver<RelayEvent>,
}

/// Everything a relay produced, gathered by [`RelayEvents::collect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayTranscript {
    /// Output lines in order
    pub lines: Vec<String>,
    /// Terminal event, absent only if the worker vanished without one
    pub terminal: Option<RelayEvent>,
}

impl RelayEvents {
    pub(crate) const fn new(rx: mpsc::UnboundedReceiver<RelayEvent>) -> Self {
        Self { rx }
    }

    /// Next event, `None` once the sequence is over
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.rx.recv().await
    }

    /// Next event if one is ready
    ///
    /// # Errors
    /// `Empty` when nothing is buffered yet, `Disconnected` once the
    /// sequence is over
    pub fn try_recv(&mut self) -> Result<RelayEvent, TryRecvError> {
        self.rx.try_recv()
    }

    /// Next event, blocking the current thread
    ///
    /// # Panics
    /// Panics when called from within an async runtime
    pub fn blocking_recv(&mut self) -> Option<RelayEvent> {
        self.rx.blocking_recv()
    }

    /// Drain the whole sequence
    pub async fn collect(mut self) -> RelayTranscript {
        let mut lines = Vec::new();
        let mut terminal = None;
        while let Some(event) = self.rx.recv().await {
            match event {
                RelayEvent::Output { line } => lines.push(line),
                other => terminal = Some(other),
            }
        }
        RelayTranscript { lines, terminal }
    }
}

impl Stream for RelayEvents {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
