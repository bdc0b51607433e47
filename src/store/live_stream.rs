//! Per-stream viewer counts, statuses and bounded chat logs.

use std::collections::HashMap;

use crate::models::{LiveStream, StreamChatEntry, StreamStatusEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct LiveStreamsSlice {
    pub streams: HashMap<u64, LiveStream>,
    pub chat_capacity: usize,
}

impl LiveStreamsSlice {
    pub fn new(chat_capacity: usize) -> Self {
        Self {
            streams: HashMap::new(),
            chat_capacity,
        }
    }

    fn entry(&mut self, stream_id: u64) -> &mut LiveStream {
        self.streams
            .entry(stream_id)
            .or_insert_with(|| LiveStream::new(stream_id))
    }

    pub fn set_viewer_count(&mut self, stream_id: u64, count: u64) {
        self.entry(stream_id).viewer_count = count;
    }

    /// Status replaces the previous one; the viewer count only moves when present.
    pub fn apply_status(&mut self, stream_id: u64, event: &StreamStatusEvent) {
        let stream = self.entry(stream_id);
        stream.status = Some(event.status());
        if let Some(count) = event.viewer_count {
            stream.viewer_count = count;
        }
    }

    pub fn push_chat(&mut self, stream_id: u64, entry: StreamChatEntry) {
        let capacity = self.chat_capacity;
        self.entry(stream_id).push_chat(entry, capacity);
    }

    pub fn clear_chat(&mut self, stream_id: u64) {
        if let Some(stream) = self.streams.get_mut(&stream_id) {
            stream.chat.clear();
        }
    }

    pub fn remove(&mut self, stream_id: u64) {
        self.streams.remove(&stream_id);
    }
}
