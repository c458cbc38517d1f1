use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use palaver_model::{
    Credential, ErrorKind, ModelProvider, ModelRequest, ModelResponse,
};
use tracing::Instrument;

use crate::error::Error;

type SendRequestResult = Result<ModelResponse, Error>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(Credential, ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that erases its type and bounds how
/// long a request may take.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    timeout: Option<Duration>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since the session doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |credential, req| {
            let fut = provider.send_request(&credential, &req);
            let boxed: BoxedSendRequestFuture = Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let result = fut.await.map_err(|err| {
                        error!("got an error: {err:?}");
                        Error::from_provider(&err)
                    });
                    trace!("finished a request");
                    result
                }
                .instrument(trace_span!("model client req")),
            );
            boxed
        });
        Self {
            handler_fn,
            timeout: None,
        }
    }

    #[inline]
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Sends a request and waits for the response.
    ///
    /// If a timeout is set and the provider doesn't answer within it, the
    /// request is dropped and an upstream error of kind
    /// [`ErrorKind::Timeout`] is returned.
    pub async fn send_request(
        &self,
        credential: &Credential,
        req: ModelRequest,
    ) -> SendRequestResult {
        let fut = (self.handler_fn)(credential.clone(), req);
        let Some(limit) = self.timeout else {
            return fut.await;
        };
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("no reply within {limit:?}");
                Err(Error::upstream(
                    ErrorKind::Timeout,
                    None,
                    format!("no reply within {} seconds", limit.as_secs_f32()),
                ))
            }
        }
    }
}
