use std::sync::Arc;
use std::time::Duration;

use folio::core::engine::{AnswerEngine, PlaybackSettings};
use folio::stream::{AnswerSource, SseAnswerSource, StreamError, StreamEvent};
use tokio::sync::mpsc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Collects every event the source sends until the channel closes.
async fn collect_events(mut receiver: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    events
}

// ============================================================================
// SSE Source Tests
// ============================================================================

#[tokio::test]
async fn test_sse_successful_stream() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"highlight_text\":\"the supporting excerpt\"}

data: {\"LLM_response\":\"The \"}

data: {\"LLM_response\":\"cat \"}

data: {\"LLM_response\":\"sat.\"}

data: [DONE]
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .and(query_param("filePath", "uploads/cats.pdf"))
        .and(query_param("question", "What did the cat do?"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_response))
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, rx) = mpsc::channel(100);
    let result = source
        .open("uploads/cats.pdf", "What did the cat do?", tx)
        .await;

    assert!(result.is_ok());

    let events = collect_events(rx).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Highlight("the supporting excerpt".to_string()),
            StreamEvent::Chunk("The ".to_string()),
            StreamEvent::Chunk("cat ".to_string()),
            StreamEvent::Chunk("sat.".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_sse_frames_without_known_payload_are_skipped() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"usage\":12}

data: {\"LLM_response\":\"Answer\"}

data: [DONE]
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_response))
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, rx) = mpsc::channel(100);
    source.open("doc.pdf", "q", tx).await.unwrap();

    let events = collect_events(rx).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Chunk("Answer".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_sse_multibyte_answer_survives_intact() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"highlight_text\":\"résumé — §2\"}

data: {\"LLM_response\":\"Les café\"}

data: {\"LLM_response\":\"s coûtent 3€.\"}

data: [DONE]
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(sse_response.as_bytes().to_vec()),
        )
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, rx) = mpsc::channel(100);
    source.open("doc.pdf", "combien ?", tx).await.unwrap();

    let events = collect_events(rx).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Highlight("résumé — §2".to_string()),
            StreamEvent::Chunk("Les café".to_string()),
            StreamEvent::Chunk("s coûtent 3€.".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_sse_api_error_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, _rx) = mpsc::channel(100);
    let result = source.open("doc.pdf", "q", tx).await;

    assert!(matches!(result, Err(StreamError::Api { status: 500, .. })));
}

#[tokio::test]
async fn test_sse_malformed_frame_is_a_parse_error() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"LLM_response\":\"ok so far\"}

data: this is not json

data: [DONE]
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_response))
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, _rx) = mpsc::channel(100);
    let result = source.open("doc.pdf", "q", tx).await;

    assert!(matches!(result, Err(StreamError::Parse(_))));
}

#[tokio::test]
async fn test_sse_body_ending_without_sentinel_is_a_network_error() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"LLM_response\":\"cut off mid\"}
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_response))
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, _rx) = mpsc::channel(100);
    let result = source.open("doc.pdf", "q", tx).await;

    assert!(matches!(result, Err(StreamError::Network(_))));
}

#[tokio::test]
async fn test_sse_channel_closed_error() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"LLM_response\":\"Hello\"}

data: [DONE]
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_response))
        .mount(&mock_server)
        .await;

    let source = SseAnswerSource::new(mock_server.uri());

    let (tx, rx) = mpsc::channel(1);
    // Drop receiver immediately to simulate channel closed
    drop(rx);

    let result = source.open("doc.pdf", "q", tx).await;

    assert!(matches!(result, Err(StreamError::ChannelClosed)));
}

// ============================================================================
// Engine-over-SSE Tests
// ============================================================================

// Real sockets need real time, so this test runs with the normal clock and a
// short character interval.
#[tokio::test]
async fn test_engine_commits_answer_from_sse_stream() {
    let mock_server = MockServer::start().await;

    let sse_response = "\
data: {\"highlight_text\":\"paragraph three\"}

data: {\"LLM_response\":\"Short \"}

data: {\"LLM_response\":\"answer.\"}

data: [DONE]
";

    Mock::given(method("GET"))
        .and(path("/chat-stream"))
        .and(query_param("filePath", "uploads/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_response))
        .mount(&mock_server)
        .await;

    let source = Arc::new(SseAnswerSource::new(mock_server.uri()));
    let settings = PlaybackSettings {
        char_interval: Duration::from_millis(1),
        stream_timeout: Duration::from_secs(10),
    };
    let mut engine = AnswerEngine::new(source, settings);

    engine
        .ask_question("uploads/report.pdf", "Summarize the findings")
        .unwrap();

    let mut view_rx = engine.view();
    loop {
        let view = view_rx.borrow_and_update().clone();
        if !view.is_loading {
            break;
        }
        assert!("Short answer.".starts_with(&view.live_answer));
        view_rx.changed().await.unwrap();
    }

    let conversation = engine.conversation();
    let conversation = conversation.lock().unwrap();
    assert_eq!(conversation.len(), 1);
    let record = conversation.last().unwrap();
    assert_eq!(record.question, "Summarize the findings");
    assert_eq!(record.answer, "Short answer.");
    assert_eq!(record.highlight, "paragraph three");
}
