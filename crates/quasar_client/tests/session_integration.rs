//! Integration tests for the chat session: message log, placeholder and
//! citation panel across full exchanges against an in-process axum server.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use quasar_client::{
    ApiClient, Body, ChatResponse, ChatSession, ChatView, CitationPanel, ClientError, Completion,
    InputEvent, Key, Message, MessageId, Page, Sender, Source, ERROR_REPLY, GREETING, NO_SOURCES,
    THINKING,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records every view notification as a line of text.
#[derive(Default)]
struct RecordingView {
    events: Vec<String>,
}

impl ChatView for RecordingView {
    fn message_appended(&mut self, id: MessageId, message: &Message) {
        self.events
            .push(format!("append {} {}", id.index(), message.content()));
    }

    fn message_replaced(&mut self, id: MessageId, message: &Message) {
        self.events
            .push(format!("replace {} {}", id.index(), message.content()));
    }

    fn citations_replaced(&mut self, panel: &CitationPanel) {
        self.events.push(format!("panel {}", panel.lines().join(" | ")));
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn api_answering(body: serde_json::Value) -> ApiClient {
    let app = Router::new().route(
        "/api/v1/chat",
        post(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    ApiClient::from_base_url(&serve(app).await).unwrap()
}

fn response(answer: &str, sources: Vec<Source>) -> ChatResponse {
    ChatResponse {
        answer: answer.to_string(),
        sources,
    }
}

#[tokio::test]
async fn refund_policy_exchange_renders_answer_and_citation() {
    let api = api_answering(json!({
        "answer": "<p>30 days</p>",
        "sources": [{"source": "policy.pdf", "page": 3}]
    }))
    .await;
    let mut session = ChatSession::setup(RecordingView::default(), None);

    let completion = session.submit(&api, "What is the refund policy?").await;
    assert_eq!(completion, Some(Completion::Answered { current: true }));

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].content(), "What is the refund policy?");
    assert_eq!(messages[1].sender, Sender::Assistant);
    assert_eq!(messages[1].body, Body::Markup("<p>30 days</p>".into()));
    assert!(messages[1].body.is_markup());
    assert!(!messages[0].body.is_markup());
    assert!(!messages[1].is_pending());
    assert_eq!(session.citations().lines(), vec!["1. policy.pdf (Page: 3)"]);

    assert_eq!(
        session.view().events,
        vec![
            "append 0 What is the refund policy?".to_string(),
            format!("panel {}", NO_SOURCES),
            format!("append 1 {}", THINKING),
            "replace 1 <p>30 days</p>".to_string(),
            "panel 1. policy.pdf (Page: 3)".to_string(),
        ]
    );
}

#[tokio::test]
async fn citation_without_page_shows_placeholder_token() {
    let api = api_answering(json!({
        "answer": "See the FAQ.",
        "sources": [{"source": "faq.pdf"}]
    }))
    .await;
    let mut session = ChatSession::setup((), None);

    session.submit(&api, "What is the refund policy?").await;

    assert_eq!(session.citations().lines(), vec!["1. faq.pdf (Page: N/A)"]);
}

#[tokio::test]
async fn several_citations_are_numbered_from_one() {
    let api = api_answering(json!({
        "answer": "ok",
        "sources": [
            {"source": "a.pdf", "page": 1},
            {"source": "b.pdf", "page": 12},
            {"source": "c.md"},
            {"source": "d.pdf", "page": 0}
        ]
    }))
    .await;
    let mut session = ChatSession::setup((), None);

    session.submit(&api, "q").await;

    assert_eq!(
        session.citations().lines(),
        vec![
            "1. a.pdf (Page: 1)",
            "2. b.pdf (Page: 12)",
            "3. c.md (Page: N/A)",
            "4. d.pdf (Page: N/A)"
        ]
    );
}

#[tokio::test]
async fn empty_source_list_shows_no_sources_text() {
    let api = api_answering(json!({"answer": "Nothing to cite.", "sources": []})).await;
    let mut session = ChatSession::setup((), None);

    session.submit(&api, "q").await;

    assert_eq!(*session.citations(), CitationPanel::NoSources);
    assert_eq!(session.citations().lines(), vec![NO_SOURCES]);
}

#[tokio::test]
async fn server_error_replaces_placeholder_with_error_text() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let api = ApiClient::from_base_url(&serve(app).await).unwrap();
    let mut session = ChatSession::setup((), None);

    let completion = session.submit(&api, "What is the refund policy?").await;

    assert_eq!(completion, Some(Completion::Failed { current: true }));
    let last = session.conversation().last().unwrap();
    assert_eq!(last.content(), ERROR_REPLY);
    assert_eq!(last.body, Body::Plain(ERROR_REPLY.into()));
    assert_eq!(*session.citations(), CitationPanel::Cleared);
}

#[tokio::test]
async fn malformed_response_is_reported_like_a_transport_failure() {
    let api = api_answering(json!({"sources": []})).await;
    let mut session = ChatSession::setup((), None);

    let completion = session.submit(&api, "q").await;

    assert_eq!(completion, Some(Completion::Failed { current: true }));
    assert_eq!(session.conversation().last().unwrap().content(), ERROR_REPLY);
    assert_eq!(*session.citations(), CitationPanel::Cleared);
}

#[tokio::test]
async fn failure_clears_citations_from_previous_answer() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let app = Router::new().route(
        "/api/v1/chat",
        post(move || {
            let hits = hits_clone.clone();
            async move {
                if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Json(json!({"answer": "first", "sources": [{"source": "x.pdf", "page": 1}]})))
                } else {
                    Err(StatusCode::BAD_GATEWAY)
                }
            }
        }),
    );
    let api = ApiClient::from_base_url(&serve(app).await).unwrap();
    let mut session = ChatSession::setup((), None);

    session.submit(&api, "one").await;
    assert_eq!(session.citations().sources().len(), 1);

    session.submit(&api, "two").await;
    assert_eq!(*session.citations(), CitationPanel::Cleared);
}

#[tokio::test]
async fn whitespace_input_sends_nothing() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let app = Router::new().route(
        "/api/v1/chat",
        post(move || {
            let hits = hits_clone.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({"answer": "ok", "sources": []}))
            }
        }),
    );
    let api = ApiClient::from_base_url(&serve(app).await).unwrap();
    let mut session = ChatSession::setup(RecordingView::default(), None);

    for input in ["", "   ", "\t\n", " \r\n "] {
        assert_eq!(session.submit(&api, input).await, None);
    }

    assert!(session.conversation().is_empty());
    assert!(session.view().events.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn question_is_trimmed_before_sending() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|Json(body): Json<serde_json::Value>| async move {
            Json(json!({"answer": body["question"], "sources": []}))
        }),
    );
    let api = ApiClient::from_base_url(&serve(app).await).unwrap();
    let mut session = ChatSession::setup((), None);

    session.submit(&api, "  padded question \n").await;

    let messages = session.conversation().messages();
    assert_eq!(messages[0].content(), "padded question");
    assert_eq!(messages[1].content(), "padded question");
}

#[test]
fn page_zero_renders_like_a_missing_page() {
    let panel = CitationPanel::from_sources(vec![Source::new("a.pdf", Some(Page::Number(0)))]);
    assert_eq!(panel.lines(), vec!["1. a.pdf (Page: N/A)"]);
}

#[test]
fn setup_shows_greeting() {
    let session = ChatSession::setup(RecordingView::default(), Some(GREETING));

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Assistant);
    assert_eq!(messages[0].content(), GREETING);
    assert_eq!(*session.citations(), CitationPanel::Cleared);
    assert_eq!(session.view().events, vec![format!("append 0 {}", GREETING)]);
}

#[test]
fn empty_greeting_is_skipped() {
    let session = ChatSession::setup((), Some(""));
    assert!(session.conversation().is_empty());
}

#[test]
fn only_submit_and_enter_trigger_an_exchange() {
    let mut session = ChatSession::setup((), None);

    assert!(session
        .handle_input(InputEvent::KeyPress(Key::Char('a')), "hello")
        .is_none());
    assert!(session
        .handle_input(InputEvent::KeyPress(Key::Other), "hello")
        .is_none());
    assert!(session.conversation().is_empty());

    let by_key = session.handle_input(InputEvent::KeyPress(Key::Enter), "hello");
    let by_button = session.handle_input(InputEvent::Submit, "again");
    assert!(by_key.is_some());
    assert!(by_button.is_some());
    assert_eq!(session.conversation().len(), 4);
    assert_eq!(session.conversation().pending_count(), 2);
}

#[test]
fn begin_appends_user_message_then_placeholder() {
    let mut session = ChatSession::setup((), Some(GREETING));

    let pending = session.begin("What is the refund policy?").unwrap();

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content(), "What is the refund policy?");
    assert_eq!(messages[2].content(), THINKING);
    assert!(messages[2].is_pending());
    assert_eq!(pending.placeholder().index(), 2);
    assert_eq!(pending.question(), "What is the refund policy?");
}

#[test]
fn stale_answer_fills_its_placeholder_but_not_the_panel() {
    let mut session = ChatSession::setup(RecordingView::default(), None);

    let first = session.begin("slow question").unwrap();
    let second = session.begin("fast question").unwrap();
    assert!(first.sequence() < second.sequence());
    let (first_id, second_id) = (first.placeholder(), second.placeholder());

    let done = session.complete(
        second,
        Ok(response(
            "fast answer",
            vec![Source::new("fast.pdf", Some(Page::Number(2)))],
        )),
    );
    assert_eq!(done, Completion::Answered { current: true });

    let done = session.complete(
        first,
        Ok(response(
            "slow answer",
            vec![Source::new("slow.pdf", Some(Page::Number(9)))],
        )),
    );
    assert_eq!(done, Completion::Answered { current: false });

    assert_eq!(session.conversation()[first_id].content(), "slow answer");
    assert_eq!(session.conversation()[second_id].content(), "fast answer");
    assert_eq!(session.citations().lines(), vec!["1. fast.pdf (Page: 2)"]);
    assert_eq!(session.conversation().pending_count(), 0);
}

#[test]
fn stale_failure_leaves_newer_panel_untouched() {
    let mut session = ChatSession::setup((), None);

    let first = session.begin("one").unwrap();
    let second = session.begin("two").unwrap();
    let first_id = first.placeholder();

    session.complete(second, Ok(response("answer two", vec![Source::new("two.pdf", None)])));
    let done = session.complete(first, Err(ClientError::Status(503)));

    assert_eq!(done, Completion::Failed { current: false });
    assert_eq!(session.conversation()[first_id].content(), ERROR_REPLY);
    assert_eq!(session.citations().lines(), vec!["1. two.pdf (Page: N/A)"]);
}

#[test]
fn each_submission_adds_exactly_two_messages() {
    let mut session = ChatSession::setup((), None);

    for (i, question) in ["a", "b", "c"].iter().enumerate() {
        let pending = session.begin(question).unwrap();
        session.complete(pending, Ok(response("ok", vec![])));
        assert_eq!(session.conversation().len(), (i + 1) * 2);
    }
    assert!(session
        .conversation()
        .messages()
        .iter()
        .all(|m| !m.is_pending()));
}
