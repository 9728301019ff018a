//! In-process transport between two contexts.
//!
//! Each request is handled on its own task, so a context can answer one
//! message while another of its handlers is still awaiting a reply. This is
//! what lets the privileged side accept `content:capture-page` while its
//! `auto:capture` handler waits on `content:start-capture`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{Dispatcher, Endpoint, Envelope, MessagingError, RawRequest};

type Delivery = (RawRequest, oneshot::Sender<Envelope>);

/// Queue depth before senders wait.
const INBOX_CAPACITY: usize = 64;

/// Sending half: an [`Endpoint`] addressing one context.
#[derive(Clone)]
pub struct ChannelEndpoint {
    name: Arc<str>,
    tx: mpsc::Sender<Delivery>,
}

/// Receiving half, owned by the context that answers.
pub struct Inbox {
    name: Arc<str>,
    rx: mpsc::Receiver<Delivery>,
}

/// Create a connected endpoint/inbox pair for a context called `name`.
#[must_use]
pub fn channel(name: &str) -> (ChannelEndpoint, Inbox) {
    let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
    let name: Arc<str> = Arc::from(name);
    (
        ChannelEndpoint {
            name: Arc::clone(&name),
            tx,
        },
        Inbox { name, rx },
    )
}

#[async_trait]
impl Endpoint for ChannelEndpoint {
    async fn post(&self, request: RawRequest) -> Result<Envelope, MessagingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| MessagingError::Disconnected(format!("{} is not listening", self.name)))?;

        reply_rx
            .await
            .map_err(|_| MessagingError::Disconnected(format!("{} dropped the reply", self.name)))
    }
}

impl Inbox {
    /// Answer requests with `dispatcher` until every endpoint is dropped.
    pub fn serve(self, dispatcher: Arc<Dispatcher>) -> JoinHandle<()> {
        let Self { name, mut rx } = self;
        tokio::spawn(async move {
            while let Some((request, reply)) = rx.recv().await {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    let envelope = dispatcher.dispatch(request).await;
                    // The sender may have timed out and gone away.
                    let _ = reply.send(envelope);
                });
            }
            tracing::debug!("Inbox {} closed", name);
        })
    }
}
