use std::{
    borrow::Cow,
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::FutureExt;
use log::debug;
use reqwest::{header::HeaderMap, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::error::{DecodeError, DiscordApiError, Error};

pub mod queue;

pub use self::queue::{Job, SingleWorker, TaskQueue, WorkerPool};

/// A fully read response. The connection is already back in the pool.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// What was sent, minus headers and body.
#[derive(Debug, Clone)]
pub struct RequestDescription {
    pub method: Method,
    pub url: Url,
}

impl RequestDescription {
    fn of(request: &reqwest::Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
        }
    }
}

impl fmt::Display for RequestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Result of a queued request. Resolves once, on completion of the call.
///
/// Dropping it does not cancel the request.
#[must_use = "the request runs regardless, but its result is lost"]
#[derive(Debug)]
pub struct ResponseFuture {
    receiver: oneshot::Receiver<Result<ApiResponse, Error>>,
}

impl Future for ResponseFuture {
    type Output = Result<ApiResponse, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(Error::Cancelled)))
    }
}

#[derive(Clone)]
pub struct Executor {
    http: reqwest::Client,
    queue: Arc<dyn TaskQueue>,
}

impl Executor {
    pub fn new(http: reqwest::Client, queue: Arc<dyn TaskQueue>) -> Self {
        Self { http, queue }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Queues `request`. The future succeeds only if the status is in `expected`.
    pub fn execute(
        &self,
        request: reqwest::Request,
        expected: &'static [u16],
    ) -> Result<ResponseFuture, Error> {
        let (sender, receiver) = oneshot::channel();
        let http = self.http.clone();

        self.queue.submit(
            async move {
                let result = perform(&http, request, expected).await;
                // nobody listening is fine, see ResponseFuture
                let _ = sender.send(result);
            }
            .boxed(),
        )?;

        Ok(ResponseFuture { receiver })
    }

    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    pub fn abort(&self) {
        self.queue.abort();
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}

async fn perform(
    http: &reqwest::Client,
    request: reqwest::Request,
    expected: &[u16],
) -> Result<ApiResponse, Error> {
    let description = RequestDescription::of(&request);
    debug!("dispatch {}", description);

    let response = http.execute(request).await.map_err(Error::Transport)?;
    let status = response.status();
    let headers = response.headers().clone();
    // reading to the end releases the connection, dropping on error does too
    let body = response.bytes().await.map_err(Error::Transport)?.to_vec();
    let response = ApiResponse {
        status,
        headers,
        body,
    };

    if expected.contains(&status.as_u16()) {
        debug!("{} - {}", description, status);
        Ok(response)
    } else {
        debug!("{} - unexpected {}", description, status);
        Err(DiscordApiError {
            expected: expected.to_vec(),
            request: description,
            response,
        }
        .into())
    }
}
