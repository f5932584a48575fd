// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A self-reconnecting server-sent events connection.
//!
//! The connection runs on a background task: connect, read until the stream
//! fails, ask the handler whether to retry, wait, reconnect. Every stage is
//! reported to an [`SseHandler`], which decides what a failure means.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode, header};
use tokio_util::sync::CancellationToken;

use crate::protocol::{SseDecoder, SseEvent, SseItem};

/// Why a stream attempt ended.
#[derive(Debug)]
pub(crate) enum StreamFailure {
    /// The server answered with a non-success status.
    Status(StatusCode),
    /// The request or the body stream failed.
    Transport(reqwest::Error),
    /// Nothing was received within the idle window.
    IdleTimeout(Duration),
    /// The server closed the stream.
    Ended,
}

impl StreamFailure {
    /// Returns the HTTP status for [`StreamFailure::Status`].
    pub(crate) fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::IdleTimeout(idle) => write!(f, "no data within {}s", idle.as_secs()),
            Self::Ended => write!(f, "stream ended"),
        }
    }
}

/// Lifecycle callbacks of an [`SseConnection`].
///
/// Called from the connection's background task. Implementations must not
/// block.
pub(crate) trait SseHandler: Send + Sync + 'static {
    /// The stream was established.
    fn on_open(&self);

    /// An event was dispatched.
    fn on_message(&self, event: &SseEvent);

    /// A comment line was received.
    fn on_comment(&self, comment: &str);

    /// The server announced a reconnect delay. Return `true` to use it.
    fn on_retry_time(&self, delay: Duration) -> bool;

    /// A stream attempt failed. Return `true` to reconnect.
    fn on_retry_error(&self, failure: &StreamFailure) -> bool;

    /// The connection will not reconnect anymore.
    fn on_closed(&self);

    /// A reconnect attempt is about to start.
    fn on_pre_retry(&self);
}

/// Settings for a single connection.
#[derive(Debug, Clone)]
pub(crate) struct StreamSettings {
    pub(crate) url: String,
    pub(crate) token: String,
    pub(crate) idle_timeout: Duration,
    pub(crate) retry_delay: Duration,
}

/// Handle to a running event stream.
///
/// Dropping the handle stops the background task.
pub(crate) struct SseConnection {
    cancel: CancellationToken,
    generation: u64,
}

impl SseConnection {
    /// Spawns the connection task and returns immediately.
    pub(crate) fn open(
        client: Client,
        settings: StreamSettings,
        handler: Arc<dyn SseHandler>,
        generation: u64,
    ) -> Self {
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(client, settings, handler, task_cancel).await;
        });

        Self { cancel, generation }
    }

    /// Identifies this connection among successive connections for the
    /// same appliance.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the connection.
    pub(crate) fn close(self) {
        self.cancel.cancel();
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseConnection")
            .field("generation", &self.generation)
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Main loop: connect, read, on failure ask the handler, wait, reconnect.
async fn stream_loop(
    client: Client,
    mut settings: StreamSettings,
    handler: Arc<dyn SseHandler>,
    cancel: CancellationToken,
) {
    loop {
        let failure = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            failure = read_stream(&client, &mut settings, handler.as_ref()) => failure,
        };

        if cancel.is_cancelled() || !handler.on_retry_error(&failure) {
            break;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(settings.retry_delay) => {}
        }

        handler.on_pre_retry();
    }

    handler.on_closed();
}

/// Runs one stream attempt until it fails.
async fn read_stream(
    client: &Client,
    settings: &mut StreamSettings,
    handler: &dyn SseHandler,
) -> StreamFailure {
    let request = client
        .get(&settings.url)
        .bearer_auth(&settings.token)
        .header(header::ACCEPT, "text/event-stream")
        .send();

    let response = match tokio::time::timeout(settings.idle_timeout, request).await {
        Err(_) => return StreamFailure::IdleTimeout(settings.idle_timeout),
        Ok(Err(err)) => return StreamFailure::Transport(err),
        Ok(Ok(response)) => response,
    };

    let status = response.status();
    if !status.is_success() {
        return StreamFailure::Status(status);
    }
    handler.on_open();

    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();
    loop {
        let chunk = match tokio::time::timeout(settings.idle_timeout, stream.next()).await {
            Err(_) => return StreamFailure::IdleTimeout(settings.idle_timeout),
            Ok(None) => return StreamFailure::Ended,
            Ok(Some(Err(err))) => return StreamFailure::Transport(err),
            Ok(Some(Ok(chunk))) => chunk,
        };

        for item in decoder.feed(&chunk) {
            match item {
                SseItem::Event(event) => handler.on_message(&event),
                SseItem::Comment(comment) => handler.on_comment(&comment),
                SseItem::Retry(delay) => {
                    if handler.on_retry_time(delay) {
                        settings.retry_delay = delay;
                    }
                }
            }
        }
    }
}
