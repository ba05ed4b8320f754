//! Background consumption of one completion stream.
//!
//! Each send spawns [`consume_stream`], which reads the [`StreamHandle`] and
//! forwards what it sees to the controller's owner as [`StreamUpdate`]s. The
//! owner hands them back through `SessionController::apply_stream_update`, so
//! all session mutation stays on one task.

use crate::ports::completion_client::{CompletionClient, CompletionError, CompletionRequest};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identifies one send. Updates from a superseded send are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub(crate) u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// What happened on a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdateKind {
    Fragment(String),
    Finished,
    Failed(CompletionError),
}

/// A stream observation waiting to be applied to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUpdate {
    pub stream_id: StreamId,
    pub kind: StreamUpdateKind,
}

/// Receiving side of the stream updates produced by a `SessionController`.
pub struct StreamUpdates {
    receiver: mpsc::UnboundedReceiver<StreamUpdate>,
}

impl StreamUpdates {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<StreamUpdate>) -> Self {
        Self { receiver }
    }

    /// Wait for the next update.
    pub async fn recv(&mut self) -> Option<StreamUpdate> {
        self.receiver.recv().await
    }

    /// Take an update if one is already queued.
    pub fn try_recv(&mut self) -> Option<StreamUpdate> {
        self.receiver.try_recv().ok()
    }
}

/// Read a completion to its end, forwarding fragments in arrival order.
///
/// Nothing is forwarded once `cancellation` has fired, and a cancelled
/// stream produces neither `Finished` nor `Failed`.
pub(crate) async fn consume_stream(
    client: Arc<dyn CompletionClient>,
    request: CompletionRequest,
    cancellation: CancellationToken,
    stream_id: StreamId,
    tx: mpsc::UnboundedSender<StreamUpdate>,
) {
    let forward = |kind: StreamUpdateKind| -> bool {
        if cancellation.is_cancelled() {
            return false;
        }
        tx.send(StreamUpdate { stream_id, kind }).is_ok()
    };

    let mut handle = match client
        .stream_completion(request, cancellation.clone())
        .await
    {
        Ok(handle) => handle,
        Err(e) if e.is_cancelled() => {
            debug!("{} cancelled before the response arrived", stream_id);
            return;
        }
        Err(e) => {
            forward(StreamUpdateKind::Failed(e));
            return;
        }
    };

    loop {
        match handle.next_fragment().await {
            Ok(Some(fragment)) => {
                if !forward(StreamUpdateKind::Fragment(fragment)) {
                    debug!("{} no longer forwarded", stream_id);
                    return;
                }
            }
            Ok(None) => {
                forward(StreamUpdateKind::Finished);
                return;
            }
            Err(e) if e.is_cancelled() => {
                debug!("{} cancelled", stream_id);
                return;
            }
            Err(e) => {
                forward(StreamUpdateKind::Failed(e));
                return;
            }
        }
    }
}
