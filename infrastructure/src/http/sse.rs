//! Incremental server-sent-events decoder.
//!
//! Byte chunks from the response body are buffered and split into lines;
//! `data:` lines are collected until a blank line completes the event. The
//! decoder only deals in payload strings; turning them into events is the
//! caller's job.
//!
//! ```text
//! data: {"type":"stage1_start"}
//!
//! data: {"type":"stage1_complete","data":[...]}
//!
//! ```

/// Stateful SSE decoder fed with raw body chunks
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the line currently being received
    line: Vec<u8>,
    /// `data:` values of the event currently being received
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every event payload it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        self.line.extend_from_slice(chunk);
        while let Some(newline) = self.line.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.line.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(payload) = self.accept_line(&String::from_utf8_lossy(&line)) {
                events.push(payload);
            }
        }
        events
    }

    /// Flush whatever is left once the body has ended.
    ///
    /// A final event without its terminating blank line is still delivered.
    pub fn finish(mut self) -> Option<String> {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            let line = String::from_utf8_lossy(&line);
            if let Some(payload) = self.accept_line(line.trim_end_matches('\r')) {
                return Some(payload);
            }
        }
        self.dispatch()
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // Comment / keep-alive
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        // `event:`, `id:` and `retry:` carry nothing the council protocol uses
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"type\":\"complete\"}\n\n");
        assert_eq!(events, vec![r#"{"type":"complete"}"#]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":").is_empty());
        assert!(decoder.push(b"\"stage1_start\"}\r\n").is_empty());
        let events = decoder.push(b"\r\ndata: {\"type\":\"stage2_start\"}\n\n");
        assert_eq!(
            events,
            vec![r#"{"type":"stage1_start"}"#, r#"{"type":"stage2_start"}"#]
        );
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: {\"title\":\"café\"}\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xc3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let events = decoder.push(&bytes[split..]);
        assert_eq!(events, vec![r#"{"title":"café"}"#]);
    }

    #[test]
    fn test_comments_and_other_fields_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\n\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"complete\"}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"type":"complete"}"#));

        assert_eq!(SseDecoder::new().finish(), None);
    }
}
