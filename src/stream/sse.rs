//! SSE client for the document-QA server's `/chat-stream` endpoint.
//!
//! The server pushes one `data:` frame per event. Frames are JSON objects
//! carrying either `highlight_text` (the supporting excerpt) or `LLM_response`
//! (an answer increment), with a literal `[DONE]` frame as the end sentinel.

use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc::Sender;

use async_trait::async_trait;

use super::source::{AnswerSource, StreamError, StreamEvent};

/// End-of-stream sentinel sent by the server as a raw data frame.
const DONE_SENTINEL: &str = "[DONE]";

/// One JSON data frame. The two payload fields are mutually exclusive per
/// frame; a frame with neither is ignored.
#[derive(Deserialize, Debug)]
struct StreamFrame {
    #[serde(default)]
    highlight_text: Option<String>,
    #[serde(rename = "LLM_response", default)]
    llm_response: Option<String>,
}

/// Answer source backed by the QA server's SSE endpoint.
pub struct SseAnswerSource {
    base_url: String,
    client: reqwest::Client,
}

impl SseAnswerSource {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Opens the streaming GET request and validates the response status.
    async fn send_request(
        &self,
        document: &str,
        question: &str,
    ) -> Result<reqwest::Response, StreamError> {
        let response = self
            .client
            .get(format!("{}/chat-stream", self.base_url))
            .query(&[("filePath", document), ("question", question)])
            .send()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        debug!("chat-stream response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("chat-stream API error: {} - {}", status, message);
            return Err(StreamError::Api { status, message });
        }

        Ok(response)
    }
}

#[async_trait]
impl AnswerSource for SseAnswerSource {
    fn name(&self) -> &str {
        "sse"
    }

    async fn open(
        &self,
        document: &str,
        question: &str,
        events: Sender<StreamEvent>,
    ) -> Result<(), StreamError> {
        info!(
            "Opening chat-stream: document={}, question_len={}",
            document,
            question.len()
        );

        let mut response = self.send_request(document, question).await?;

        let mut pending = Vec::new();
        let mut buffer = String::new();
        let mut chunk_count = 0usize;
        let mut total_content_len = 0usize;

        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?
        {
            pending.extend_from_slice(&bytes);
            decode_complete_utf8(&mut pending, &mut buffer);

            // Process complete lines from the buffer
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].to_string();
                buffer.drain(..pos + 1);

                let line = line.trim();
                let Some(data) = line.strip_prefix("data:") else {
                    // Blank separators and comment lines carry no payload
                    continue;
                };
                let data = data.trim_start();

                if data == DONE_SENTINEL {
                    info!(
                        "Stream complete: {} chunks, {} content bytes",
                        chunk_count, total_content_len
                    );
                    if events.send(StreamEvent::Done).await.is_err() {
                        warn!("Done send failed: receiver dropped");
                        return Err(StreamError::ChannelClosed);
                    }
                    return Ok(());
                }

                let frame: StreamFrame = serde_json::from_str(data)
                    .map_err(|e| StreamError::Parse(format!("bad frame: {e}")))?;

                let event = if let Some(text) = frame.highlight_text {
                    debug!("Highlight frame (len={})", text.len());
                    StreamEvent::Highlight(text)
                } else if let Some(text) = frame.llm_response {
                    chunk_count += 1;
                    total_content_len += text.len();
                    debug!(
                        "Answer chunk (len={}, total={})",
                        text.len(),
                        total_content_len
                    );
                    StreamEvent::Chunk(text)
                } else {
                    debug!("Frame with no known payload, skipping: {} bytes", data.len());
                    continue;
                };

                if events.send(event).await.is_err() {
                    warn!("Event send failed: receiver dropped");
                    return Err(StreamError::ChannelClosed);
                }
            }
        }

        // The sentinel never arrived; the connection dropped mid-stream.
        warn!(
            "Stream closed without end sentinel ({} chunks received)",
            chunk_count
        );
        Err(StreamError::Network(
            "stream closed before end-of-stream marker".to_string(),
        ))
    }
}

/// Moves the decodable prefix of `pending` into `out`.
///
/// Network chunk boundaries do not respect UTF-8 boundaries, so a multibyte
/// character can be split across two reads. An incomplete trailing sequence is
/// left in `pending` for the next chunk to finish; genuinely invalid bytes
/// become a replacement character.
fn decode_complete_utf8(pending: &mut Vec<u8>, out: &mut String) {
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(len) => {
                        out.push('\u{FFFD}');
                        pending.drain(..valid + len);
                    }
                    // Incomplete trailing sequence; wait for more bytes
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_deserializes_highlight() {
        let frame: StreamFrame =
            serde_json::from_str(r#"{"highlight_text":"supporting span"}"#).unwrap();
        assert_eq!(frame.highlight_text.as_deref(), Some("supporting span"));
        assert!(frame.llm_response.is_none());
    }

    #[test]
    fn test_frame_deserializes_answer_increment() {
        let frame: StreamFrame = serde_json::from_str(r#"{"LLM_response":"The cat"}"#).unwrap();
        assert_eq!(frame.llm_response.as_deref(), Some("The cat"));
        assert!(frame.highlight_text.is_none());
    }

    #[test]
    fn test_frame_with_unknown_fields_has_no_payload() {
        let frame: StreamFrame = serde_json::from_str(r#"{"usage":100}"#).unwrap();
        assert!(frame.highlight_text.is_none());
        assert!(frame.llm_response.is_none());
    }

    #[test]
    fn test_malformed_frame_is_a_parse_error() {
        let result = serde_json::from_str::<StreamFrame>("not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_reassembles_a_char_split_across_chunks() {
        // "é" is [0xC3, 0xA9]; the network may deliver the bytes separately
        let mut pending = Vec::new();
        let mut out = String::new();

        pending.extend_from_slice(&[0xC3]);
        decode_complete_utf8(&mut pending, &mut out);
        assert_eq!(out, "");
        assert_eq!(pending, vec![0xC3]);

        pending.extend_from_slice(&[0xA9, b'!']);
        decode_complete_utf8(&mut pending, &mut out);
        assert_eq!(out, "é!");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_decode_keeps_incomplete_tail_after_valid_text() {
        // Full ASCII text followed by the first two bytes of a three-byte char
        let mut pending = b"data: ".to_vec();
        pending.extend_from_slice(&[0xE2, 0x82]);
        let mut out = String::new();

        decode_complete_utf8(&mut pending, &mut out);
        assert_eq!(out, "data: ");
        assert_eq!(pending, vec![0xE2, 0x82]);

        pending.push(0xAC);
        decode_complete_utf8(&mut pending, &mut out);
        assert_eq!(out, "data: €");
    }

    #[test]
    fn test_decode_replaces_invalid_bytes_and_continues() {
        let mut pending = vec![b'a', 0xFF, b'b'];
        let mut out = String::new();

        decode_complete_utf8(&mut pending, &mut out);
        assert_eq!(out, "a\u{FFFD}b");
        assert!(pending.is_empty());
    }
}
