use serde::Deserialize;

/// Incremental decoder for the server's event-stream framing.
///
/// Payloads arrive one per line, optionally behind an SSE `data:` field
/// prefix, and chunk boundaries can fall anywhere. The decoder buffers
/// partial lines and yields complete payloads in order.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed one transport chunk, returning every payload it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            } else if line.starts_with('{') {
                // some proxies strip the field prefix and forward bare JSON
                payloads.push(line.to_string());
            }
        }
        payloads
    }
}

/// `{"result": ...}` wrapper used by both streaming endpoints. A missing
/// `result` deserializes to `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: Option<T>,
}
