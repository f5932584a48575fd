// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental `text/event-stream` decoder.
//!
//! Network chunks are fed in as they arrive; complete lines are turned into
//! [`SseItem`]s. A chunk may end in the middle of a line, or in the middle of
//! a UTF-8 sequence, so bytes are buffered until a line feed is seen.

use std::time::Duration;

/// A dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Last event id seen on the stream, if any.
    pub id: Option<String>,
    /// Event name (`event:` field).
    pub event: Option<String>,
    /// Data lines joined with `\n`.
    pub data: String,
}

/// One decoded element of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    /// A complete event, dispatched on a blank line.
    Event(SseEvent),
    /// A comment line (starting with `:`), without the colon.
    Comment(String),
    /// A reconnection delay announced by the server.
    Retry(Duration),
}

/// Line-oriented decoder for server-sent events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    last_id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every item it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseItem> {
        self.buffer.extend_from_slice(chunk);

        let mut items = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(item) = self.process_line(&line) {
                items.push(item);
            }
        }
        items
    }

    fn process_line(&mut self, line: &str) -> Option<SseItem> {
        if line.is_empty() {
            return self.dispatch();
        }

        if let Some(comment) = line.strip_prefix(':') {
            return Some(SseItem::Comment(comment.trim_start().to_string()));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            "retry" => {
                if let Ok(millis) = value.trim().parse::<u64>() {
                    return Some(SseItem::Retry(Duration::from_millis(millis)));
                }
            }
            other => tracing::trace!(field = %other, "Ignoring unknown SSE field"),
        }
        None
    }

    /// Emits the pending event, if it has a name or data.
    fn dispatch(&mut self) -> Option<SseItem> {
        let event = self.event.take().filter(|name| !name.is_empty());
        let data = std::mem::take(&mut self.data);
        if event.is_none() && data.is_empty() {
            return None;
        }

        Some(SseItem::Event(SseEvent {
            id: self.last_id.clone(),
            event,
            data: data.join("\n"),
        }))
    }
}
