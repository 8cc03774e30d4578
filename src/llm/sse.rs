//! Incremental decoder for server-sent-event frames
//!
//! The streaming endpoint delivers `data: {json}` lines whose boundaries
//! do not line up with network chunk boundaries. The decoder buffers raw
//! bytes, emits each completed data payload in arrival order, and does no
//! reordering or buffering beyond the line split. Splitting the same
//! frames differently across chunks never changes the output.

/// Stateful line-oriented SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every data payload completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(payload) = Self::data_payload(&line) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }

    /// Flush a trailing unterminated line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Self::data_payload(line.trim_end_matches('\r')).map(str::to_string)
    }

    /// Extract the payload of a `data:` line; other field lines, comments
    /// and blank separators carry no payload.
    fn data_payload(line: &str) -> Option<&str> {
        let rest = line.strip_prefix("data:")?;
        Some(rest.strip_prefix(' ').unwrap_or(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: &str = "data: {\"a\":1}\r\n\r\ndata: {\"b\":2}\n\ndata: {\"c\":3}\n\n";

    fn decode_in_chunks(input: &[u8], chunk_size: usize) -> Vec<String> {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for chunk in input.chunks(chunk_size) {
            out.extend(decoder.feed(chunk));
        }
        out.extend(decoder.finish());
        out
    }

    #[test]
    fn single_chunk_decodes_all_frames() {
        let payloads = decode_in_chunks(FRAMES.as_bytes(), FRAMES.len());
        assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn arbitrary_chunk_boundaries_do_not_change_output() {
        let reference = decode_in_chunks(FRAMES.as_bytes(), FRAMES.len());
        for size in 1..FRAMES.len() {
            assert_eq!(decode_in_chunks(FRAMES.as_bytes(), size), reference, "chunk size {}", size);
        }
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let input = b": keep-alive\nevent: message\ndata: payload\nid: 7\n\n";
        let payloads = decode_in_chunks(input, input.len());
        assert_eq!(payloads, vec!["payload"]);
    }

    #[test]
    fn unterminated_trailing_line_is_flushed_by_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail-without-newline").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail-without-newline"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn multibyte_utf8_split_across_chunks_survives() {
        let input = "data: {\"text\":\"سلام\"}\n\n".as_bytes();
        let reference = decode_in_chunks(input, input.len());
        // Split on every byte boundary, including mid-codepoint.
        for size in 1..input.len() {
            assert_eq!(decode_in_chunks(input, size), reference);
        }
    }
}
