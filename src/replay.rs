//! Script replay driving an [`EventRouter`] for the binary.
//!
//! A script is a JSON-lines file: each line is either an inbound event
//! (`{"event": "presence", ...}`) or a pause (`{"wait_ms": 500}`) that lets
//! fragment deadlines fire. Every emitted notification is written to the
//! output as one JSON line.

use std::{path::PathBuf, time::Duration};

use jabber_events::{
    ContactStatusChanged,
    EventRouter,
    InboundEvent,
    ListenerId,
    MessageAssembled,
    ResourceChanged,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, UnboundedReceiver},
};

/// Failures while replaying a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Reading the script or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A script line was not a valid step.
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    /// The configuration file could not be read or was invalid.
    #[error("configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    /// An emitted notification could not be serialised.
    #[error("failed to encode output: {0}")]
    Encode(serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Step {
    Wait { wait_ms: u64 },
    Event(InboundEvent),
}

#[derive(Serialize)]
#[serde(tag = "emitted", rename_all = "snake_case")]
enum Emitted {
    StatusChanged(ContactStatusChanged),
    ResourceChanged(ResourceChanged),
    Message(MessageAssembled),
}

/// Callbacks forwarding every notification, in emission order, into one
/// channel.
struct Subscriptions<'a> {
    router: &'a EventRouter,
    ids: [ListenerId; 3],
    rx: UnboundedReceiver<Emitted>,
}

impl<'a> Subscriptions<'a> {
    fn attach(router: &'a EventRouter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let statuses = tx.clone();
        let resources = tx.clone();
        let ids = [
            router
                .presence()
                .status_listeners()
                .add(move |event: &ContactStatusChanged| {
                    let _ = statuses.send(Emitted::StatusChanged(event.clone()));
                }),
            router
                .presence()
                .resource_listeners()
                .add(move |event: &ResourceChanged| {
                    let _ = resources.send(Emitted::ResourceChanged(event.clone()));
                }),
            router
                .messages()
                .listeners()
                .add(move |event: &MessageAssembled| {
                    let _ = tx.send(Emitted::Message(event.clone()));
                }),
        ];
        Self { router, ids, rx }
    }

    async fn drain<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> Result<usize, ScriptError> {
        let mut written = 0;
        while let Ok(emitted) = self.rx.try_recv() {
            write_line(out, &emitted).await?;
            written += 1;
        }
        Ok(written)
    }
}

impl Drop for Subscriptions<'_> {
    fn drop(&mut self) {
        let [statuses, resources, messages] = self.ids;
        self.router.presence().status_listeners().remove(statuses);
        self.router.presence().resource_listeners().remove(resources);
        self.router.messages().listeners().remove(messages);
    }
}

async fn write_line<W: AsyncWrite + Unpin>(
    out: &mut W,
    emitted: &Emitted,
) -> Result<(), ScriptError> {
    let mut line = serde_json::to_vec(emitted).map_err(ScriptError::Encode)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    Ok(())
}

/// Replay `script` through `router`, writing notifications to `out`.
///
/// The router is closed once the script ends, flushing any incomplete
/// message. Returns the number of notifications written.
///
/// # Errors
///
/// Returns [`ScriptError`] if the script cannot be read or parsed, or if
/// output cannot be written.
pub async fn replay<R, W>(
    router: &EventRouter,
    script: R,
    out: &mut W,
) -> Result<usize, ScriptError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut subscriptions = Subscriptions::attach(router);
    let mut lines = script.lines();
    let mut number = 0;
    let mut written = 0;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let step: Step = serde_json::from_str(&line).map_err(|source| ScriptError::Parse {
            line: number,
            source,
        })?;
        match step {
            Step::Wait { wait_ms } => tokio::time::sleep(Duration::from_millis(wait_ms)).await,
            Step::Event(event) => router.dispatch(event),
        }
        written += subscriptions.drain(out).await?;
    }
    router.close();
    written += subscriptions.drain(out).await?;
    out.flush().await?;
    Ok(written)
}
