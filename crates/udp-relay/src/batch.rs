// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

use crate::errors::BatchError;

/// Largest request body accepted by a standard tier hub
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1024 * 1024;

// "[" + "]"
const ENVELOPE_SIZE: usize = 2;

/// A single event in the REST batch format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventData {
    #[serde(rename = "Body")]
    pub body: String,
}

impl EventData {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    fn encoded_size(&self) -> Result<usize, serde_json::Error> {
        serde_json::to_vec(self).map(|encoded| encoded.len())
    }
}

/// Events submitted together in one request.
#[derive(Debug, Clone)]
pub struct EventBatch {
    events: Vec<EventData>,
    size: usize,
    max_size: usize,
}

impl EventBatch {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: Vec::new(),
            size: ENVELOPE_SIZE,
            max_size,
        }
    }

    /// Appends `event` unless the encoded batch would exceed the size limit.
    pub fn try_add(&mut self, event: EventData) -> Result<(), BatchError> {
        let event_size = event.encoded_size().unwrap_or(usize::MAX);
        // separating comma
        let separator = usize::from(!self.events.is_empty());
        let new_size = self
            .size
            .saturating_add(event_size)
            .saturating_add(separator);
        if new_size > self.max_size {
            return Err(BatchError::TooLarge {
                event_size,
                current_size: self.size,
                max_size: self.max_size,
            });
        }
        self.size = new_size;
        self.events.push(event);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Size in bytes of [`EventBatch::to_body`]
    pub fn size_in_bytes(&self) -> usize {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn events(&self) -> &[EventData] {
        &self.events
    }

    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.events)
    }
}
