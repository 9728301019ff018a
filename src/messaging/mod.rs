//! Cross-context request/response messaging.
//!
//! The page-embedded content context and the privileged capture context only
//! talk through messages. Every request is `{event, data}` and every reply is
//! an [`Envelope`] `{result, error}`, because the transport cannot carry a
//! thrown error across the boundary.
//!
//! # Architecture
//!
//! - [`Message`]: typed event map entry (tag, request payload, response)
//! - [`Dispatcher`]: event tag → handler table on the receiving side
//! - [`Endpoint`]: one-shot delivery of a [`RawRequest`] to another context
//! - [`Client`]: typed, timeout-bounded sender that unwraps envelopes
//! - [`channel`]: in-process transport between two contexts
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use slideprint::messaging::{channel, events, Client, Dispatcher};
//!
//! # async fn example() -> Result<(), slideprint::messaging::MessagingError> {
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.on::<events::ContentReady, _, _>(|()| async { Ok(true) });
//!
//! let (endpoint, inbox) = channel("content");
//! inbox.serve(Arc::new(dispatcher));
//!
//! let client = Client::new(Arc::new(endpoint));
//! assert!(client.send::<events::ContentReady>(()).await?);
//! # Ok(())
//! # }
//! ```

mod channel;
mod dispatch;
pub mod events;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::browser::{Browser, TabId};
use crate::config::MessagingConfig;

pub use channel::{channel, ChannelEndpoint, Inbox};
pub use dispatch::Dispatcher;

/// Messaging errors surfaced to the sender.
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("message '{event}' timed out after {after:?}")]
    Timeout { event: String, after: Duration },

    #[error("receiving context is gone: {0}")]
    Disconnected(String),

    /// The handler on the other side failed; carries its message.
    #[error("{0}")]
    Remote(String),

    #[error("invalid payload for '{event}': {source}")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Typed entry of the event catalog.
///
/// Each event is a zero-sized type naming its wire tag and payload types; see
/// [`events`].
pub trait Message {
    /// Wire tag, e.g. `"content:capture-page"`.
    const EVENT: &'static str;
    /// Request payload. `()` for events without data.
    type Request: Serialize + DeserializeOwned + Send + 'static;
    /// Response value carried in [`Envelope::result`].
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

/// Untyped request as it travels between contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RawRequest {
    /// Request with no payload.
    pub fn bare(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: None,
        }
    }

    /// Encode a typed request. A unit payload is sent without `data`.
    pub fn encode<M: Message>(data: &M::Request) -> Result<Self, MessagingError> {
        let value = serde_json::to_value(data).map_err(|source| MessagingError::Decode {
            event: M::EVENT.to_string(),
            source,
        })?;
        Ok(Self {
            event: M::EVENT.to_string(),
            data: (!value.is_null()).then_some(value),
        })
    }
}

/// Reply wrapper marshaling handler errors as data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Unwrap into the carried result, or the remote error.
    pub fn into_result(self) -> Result<Value, MessagingError> {
        match self.error {
            Some(message) => Err(MessagingError::Remote(message)),
            None => Ok(self.result),
        }
    }
}

/// Decode a payload that may be absent.
///
/// Missing data decodes as `null` first, then as an empty object, so both
/// `()` and all-optional structs accept a bare request.
pub(crate) fn decode_payload<T: DeserializeOwned>(data: Option<Value>) -> serde_json::Result<T> {
    match data {
        None | Some(Value::Null) => serde_json::from_value(Value::Null)
            .or_else(|_| serde_json::from_value(Value::Object(serde_json::Map::new()))),
        Some(value) => serde_json::from_value(value),
    }
}

/// Delivery of one request to another context.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Deliver `request` and wait for the reply envelope.
    ///
    /// Fails with [`MessagingError::Disconnected`] when no context is
    /// listening any more.
    async fn post(&self, request: RawRequest) -> Result<Envelope, MessagingError>;
}

/// Typed sender for one destination context.
#[derive(Clone)]
pub struct Client {
    endpoint: Arc<dyn Endpoint>,
    timeout: Duration,
}

impl Client {
    /// Default round-trip bound.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            endpoint,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the default round-trip bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a typed request with the default timeout.
    pub async fn send<M: Message>(&self, data: M::Request) -> Result<M::Response, MessagingError> {
        self.send_with_timeout::<M>(data, self.timeout).await
    }

    /// Send a typed request, rejecting if no reply arrives within `timeout`.
    ///
    /// The envelope is unwrapped: a handler returning `V` yields `Ok(V)`, a
    /// failing handler yields [`MessagingError::Remote`] with its message.
    pub async fn send_with_timeout<M: Message>(
        &self,
        data: M::Request,
        timeout: Duration,
    ) -> Result<M::Response, MessagingError> {
        let request = RawRequest::encode::<M>(&data)?;
        tracing::debug!("Sending {}", M::EVENT);

        let envelope = tokio::time::timeout(timeout, self.endpoint.post(request))
            .await
            .map_err(|_| MessagingError::Timeout {
                event: M::EVENT.to_string(),
                after: timeout,
            })??;

        let value = envelope.into_result()?;
        serde_json::from_value(value).map_err(|source| MessagingError::Decode {
            event: M::EVENT.to_string(),
            source,
        })
    }
}

/// Retry policy for [`ensure_content_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyProbe {
    /// Ping attempts before giving up.
    pub retries: u32,
    /// Pause after each failed attempt.
    pub delay: Duration,
    /// Bound on a single ping.
    pub ping_timeout: Duration,
}

impl From<&MessagingConfig> for ReadyProbe {
    fn from(config: &MessagingConfig) -> Self {
        Self {
            retries: config.ready_retries,
            delay: config.ready_delay(),
            ping_timeout: config.timeout(),
        }
    }
}

impl Default for ReadyProbe {
    fn default() -> Self {
        Self::from(&MessagingConfig::default())
    }
}

/// Make sure a tab's content context answers `content:ready`.
///
/// Between failed pings the content script is re-injected, covering the race
/// between tab creation and script injection. Returns `false` once all
/// attempts are spent.
pub async fn ensure_content_ready(browser: &dyn Browser, tab: TabId, probe: ReadyProbe) -> bool {
    let client = Client::new(browser.tab_endpoint(tab)).with_timeout(probe.ping_timeout);

    for attempt in 1..=probe.retries {
        match client.send::<events::ContentReady>(()).await {
            Ok(true) => {
                tracing::debug!("Tab {} content ready after {} attempt(s)", tab, attempt);
                return true;
            }
            Ok(false) => tracing::debug!("Tab {} answered not ready", tab),
            Err(e) => tracing::debug!("Ping {} to tab {} failed: {}", attempt, tab, e),
        }

        if let Err(e) = browser.inject_content_script(tab).await {
            tracing::debug!("Injecting content script into tab {} failed: {}", tab, e);
        }
        tokio::time::sleep(probe.delay).await;
    }

    tracing::warn!("Tab {} content context never became ready", tab);
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use super::*;
    use crate::browser::testing::FakeBrowser;
    use crate::counter::SlideCount;

    fn serve(dispatcher: Dispatcher) -> Client {
        let (endpoint, inbox) = channel("test");
        inbox.serve(Arc::new(dispatcher));
        Client::new(Arc::new(endpoint))
    }

    #[tokio::test]
    async fn round_trip_unwraps_envelope() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on::<events::GetCounts, _, _>(|()| async {
            Ok(Some(SlideCount {
                current: 1,
                total: 10,
            }))
        });

        let client = serve(dispatcher);
        let counts = client.send::<events::GetCounts>(()).await.unwrap();
        assert_eq!(
            counts,
            Some(SlideCount {
                current: 1,
                total: 10
            })
        );
    }

    #[tokio::test]
    async fn handler_error_arrives_as_remote_error() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on::<events::OpenOutput, _, _>(|()| async {
            anyhow::bail!("output page blocked")
        });

        let client = serve(dispatcher);
        let err = client.send::<events::OpenOutput>(()).await.unwrap_err();
        assert!(matches!(err, MessagingError::Remote(ref m) if m == "output page blocked"));
    }

    #[tokio::test]
    async fn unknown_event_decodes_as_null() {
        let client = serve(Dispatcher::new());
        // Option<SlideCount> accepts the null an unknown tag produces.
        let counts = client.send::<events::GetCounts>(()).await.unwrap();
        assert_eq!(counts, None);
        // bool does not.
        let err = client.send::<events::Reset>(()).await.unwrap_err();
        assert!(matches!(err, MessagingError::Decode { .. }));
    }

    struct SilentEndpoint;

    #[async_trait]
    impl Endpoint for SilentEndpoint {
        async fn post(&self, _request: RawRequest) -> Result<Envelope, MessagingError> {
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_timeout_rejects_without_reply() {
        let client = Client::new(Arc::new(SilentEndpoint));
        let err = client
            .send_with_timeout::<events::OpenOutput>((), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("open:output"));
    }

    #[tokio::test]
    async fn closed_inbox_is_disconnected() {
        let (endpoint, inbox) = channel("closed");
        drop(inbox);
        let client = Client::new(Arc::new(endpoint));
        let err = client.send::<events::ContentReady>(()).await.unwrap_err();
        assert!(matches!(err, MessagingError::Disconnected(_)));
    }

    #[test]
    fn unit_payload_is_sent_without_data() {
        let request = RawRequest::encode::<events::ContentReady>(&()).unwrap();
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"event": "content:ready"}));
    }

    #[test]
    fn envelope_wire_shape() {
        assert_eq!(
            serde_json::to_value(Envelope::ok(json!(true))).unwrap(),
            json!({"result": true, "error": null})
        );
        let parsed: Envelope = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert!(matches!(parsed.into_result(), Err(MessagingError::Remote(m)) if m == "boom"));
    }

    #[test]
    fn bare_payload_decodes_into_optional_struct() {
        let req: events::CapturePageRequest = decode_payload(None).unwrap();
        assert!(!req.done);
        assert!(req.dimensions.is_none());
        let (): () = decode_payload(None).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_content_ready_retries_and_injects() {
        let browser = FakeBrowser::new();
        let pings = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&pings);
        browser.set_tab_responder(move |request| {
            assert_eq!(request.event, "content:ready");
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(MessagingError::Disconnected("no listener".into()))
            } else {
                Ok(Envelope::ok(json!(true)))
            }
        });

        let probe = ReadyProbe {
            retries: 2,
            delay: Duration::from_millis(1),
            ping_timeout: Duration::from_millis(50),
        };
        assert!(ensure_content_ready(&browser, 7, probe).await);
        assert_eq!(pings.load(Ordering::SeqCst), 2);
        assert_eq!(browser.injections(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_content_ready_gives_up() {
        let browser = FakeBrowser::new();
        browser.set_tab_responder(|_| Err(MessagingError::Disconnected("no listener".into())));

        let probe = ReadyProbe {
            retries: 3,
            delay: Duration::from_millis(1),
            ping_timeout: Duration::from_millis(50),
        };
        assert!(!ensure_content_ready(&browser, 3, probe).await);
        assert_eq!(browser.injections().len(), 3);
    }
}
