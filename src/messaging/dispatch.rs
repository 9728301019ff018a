//! Event tag → handler table.

use std::collections::HashMap;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::{decode_payload, Envelope, Message, RawRequest};

type BoxedHandler = Box<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Routes incoming requests to the handler registered for their event tag.
///
/// Whatever happens inside a handler comes back as an [`Envelope`]: results
/// are serialized into `result`, failures (including undecodable payloads)
/// into `error`. Unknown tags answer `null`.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `M`'s event tag, replacing any earlier one.
    pub fn on<M, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        M: Message,
        F: Fn(M::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<M::Response>> + Send + 'static,
    {
        let erased = move |data: Option<Value>| -> BoxFuture<'static, Result<Value, String>> {
            let request = match decode_payload::<M::Request>(data) {
                Ok(request) => request,
                Err(e) => {
                    let message = format!("invalid payload for '{}': {e}", M::EVENT);
                    return futures::future::ready(Err(message)).boxed();
                }
            };
            let fut = handler(request);
            async move {
                let response = fut.await.map_err(|e| format!("{e:#}"))?;
                serde_json::to_value(response).map_err(|e| e.to_string())
            }
            .boxed()
        };

        self.handlers.insert(M::EVENT, Box::new(erased));
        self
    }

    /// Handle one request and wrap the outcome.
    pub async fn dispatch(&self, request: RawRequest) -> Envelope {
        let Some(handler) = self.handlers.get(request.event.as_str()) else {
            tracing::debug!("No handler for {}", request.event);
            return Envelope::ok(Value::Null);
        };

        match handler(request.data).await {
            Ok(result) => Envelope::ok(result),
            Err(message) => {
                tracing::warn!("Handler for {} failed: {}", request.event, message);
                Envelope::err(message)
            }
        }
    }
}
