//! Incremental `text/event-stream` decoder.

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct ServerEvent {
    /// Event type; `message` when the stream does not name one.
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
}

/// Buffers partial chunks and yields complete events.
///
/// Lines are decoded only once complete, so multi-byte characters split
/// across network chunks survive.
#[derive(Debug, Default)]
pub(super) struct EventStreamDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl EventStreamDecoder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event completed by it.
    pub(super) fn push(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=position).collect();
            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            self.accept_line(line);
        }

        events
    }

    fn accept_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = line.split_once(':').map_or((line, ""), |(name, rest)| {
            (name, rest.strip_prefix(' ').unwrap_or(rest))
        });
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(ServerEvent {
            event: event.unwrap_or_else(|| "message".to_owned()),
            data,
        })
    }
}
