use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use chatrelay::client::message::{FAILURE_NOTICE, FILE_SENT_LABEL};
use chatrelay::client::{
    ChatSession, ExchangeOutcome, HttpRelay, OutboundRequest, PendingAttachment, RelayTransport,
    RevealOutcome, Sender, TransportError,
};

/// Records every request and answers from a script of replies.
/// `None` in the script makes the send itself fail, as if the request never left.
struct ScriptedTransport {
    requests: Mutex<Vec<OutboundRequest>>,
    replies: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedTransport {
    fn new(replies: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.iter().map(|r| r.map(str::to_string)).collect()),
        })
    }

    fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayTransport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(reply) => Ok(reply),
            None => Err(TransportError::InvalidMimeType("unsendable".into())),
        }
    }
}

/// Holds every request until the test opens the gate.
struct GatedTransport {
    gate: Notify,
    requests: Mutex<Vec<OutboundRequest>>,
}

#[async_trait]
impl RelayTransport for GatedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.gate.notified().await;
        Ok("done".into())
    }
}

fn cat_png() -> PendingAttachment {
    PendingAttachment::new(vec![1, 2, 3], "image/png", "cat.png")
}

async fn finish(outcome: ExchangeOutcome) -> Option<RevealOutcome> {
    match outcome {
        ExchangeOutcome::Replied(reveal) => Some(reveal.finished().await),
        ExchangeOutcome::Failed(_) => None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_text_submission_appends_one_entry_and_sends_one_request() {
    let transport = ScriptedTransport::new(&[Some("ok")]);
    let mut session = ChatSession::new(transport.clone());

    session.set_input("hello");
    let exchange = session.submit().await.expect("submission should be sent");

    // Appended and cleared before the request resolves.
    assert_eq!(session.input(), "");
    {
        let transcript = session.transcript();
        let transcript = transcript.lock().await;
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].sender, Sender::User);
        assert_eq!(transcript.entries()[0].content, "hello");
    }

    finish(exchange.await.unwrap()).await;
    assert_eq!(
        transport.requests(),
        vec![OutboundRequest {
            msg: "hello".into(),
            file: None
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_file_only_submission() {
    let transport = ScriptedTransport::new(&[Some("a cat")]);
    let mut session = ChatSession::new(transport.clone());

    session.select_attachment(cat_png()).await;
    let exchange = session.submit().await.unwrap();
    assert!(session.pending_attachment().is_none());
    finish(exchange.await.unwrap()).await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].msg, "");
    assert_eq!(requests[0].file, Some(cat_png()));

    let transcript = session.transcript();
    let transcript = transcript.lock().await;
    let entries = transcript.entries();
    assert_eq!(entries[0].content, "Selected File: cat.png");
    assert_eq!(entries[0].sender, Sender::User);
    assert_eq!(entries[1].content, FILE_SENT_LABEL);
    assert_eq!(entries[1].sender, Sender::User);
}

#[tokio::test(start_paused = true)]
async fn test_empty_submission_does_nothing() {
    let transport = ScriptedTransport::new(&[Some("never")]);
    let mut session = ChatSession::new(transport.clone());

    assert!(session.submit().await.is_none());
    assert!(session.transcript().lock().await.is_empty());
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reply_is_revealed_exactly() {
    let reply = "Héllo, wörld! 🦀\nSecond line.";
    let transport = ScriptedTransport::new(&[Some(reply)]);
    let mut session = ChatSession::new(transport);

    session.set_input("greet me");
    let outcome = session.submit().await.unwrap().await.unwrap();
    assert_eq!(finish(outcome).await, Some(RevealOutcome::Completed));

    let transcript = session.transcript();
    let transcript = transcript.lock().await;
    let last = transcript.last().unwrap();
    assert_eq!(last.sender, Sender::Model);
    assert_eq!(last.content, reply);
    assert!(last.display_id.is_some());
    assert_eq!(transcript.scroll_anchor(), Some(transcript.len() - 1));
}

#[tokio::test(start_paused = true)]
async fn test_relay_failure_appends_single_error_entry() {
    let transport = ScriptedTransport::new(&[None]);
    let mut session = ChatSession::new(transport);

    session.select_attachment(cat_png()).await;
    session.set_input("hello");
    let outcome = session.submit().await.unwrap().await.unwrap();
    assert!(matches!(outcome, ExchangeOutcome::Failed(_)));
    assert!(session.pending_attachment().is_none());

    let transcript = session.transcript();
    let transcript = transcript.lock().await;
    let errors: Vec<_> = transcript
        .entries()
        .iter()
        .filter(|m| m.sender == Sender::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].content, FAILURE_NOTICE);
    assert!(transcript.entries().iter().all(|m| m.sender != Sender::Model));
}

#[tokio::test]
async fn test_unreachable_relay_is_reported() {
    // Nothing listens on port 1.
    let mut session = ChatSession::new(Arc::new(HttpRelay::new("http://127.0.0.1:1")));
    session.set_input("anyone there?");
    let outcome = session.submit().await.unwrap().await.unwrap();
    assert!(matches!(
        outcome,
        ExchangeOutcome::Failed(TransportError::Request(_))
    ));

    let transcript = session.transcript();
    let transcript = transcript.lock().await;
    assert_eq!(transcript.last().unwrap().content, FAILURE_NOTICE);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reveals_do_not_interleave() {
    let transport = ScriptedTransport::new(&[Some("first reply"), Some("second")]);
    let mut session = ChatSession::new(transport);

    session.set_input("one");
    let first = session.submit().await.unwrap();
    session.set_input("two");
    let second = session.submit().await.unwrap();

    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    let (ExchangeOutcome::Replied(a), ExchangeOutcome::Replied(b)) = (first, second) else {
        panic!("both exchanges should succeed");
    };
    assert_ne!(a.id(), b.id());
    let (a_id, b_id) = (a.id().clone(), b.id().clone());
    assert_eq!(a.finished().await, RevealOutcome::Completed);
    assert_eq!(b.finished().await, RevealOutcome::Completed);

    let transcript = session.transcript();
    let transcript = transcript.lock().await;
    let mut contents: Vec<_> = [a_id, b_id]
        .iter()
        .map(|id| transcript.get(id).unwrap().content.clone())
        .collect();
    // The two exchanges may resolve in either order.
    contents.sort();
    assert_eq!(contents, vec!["first reply".to_string(), "second".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_cancelling_one_reveal_leaves_the_other_running() {
    let mut session = ChatSession::new(ScriptedTransport::new(&[]));
    let long = session.on_reply_received("a long reply that takes a while".into()).await;
    let short = session.on_reply_received("short".into()).await;

    long.cancel();
    assert_eq!(long.finished().await, RevealOutcome::Cancelled);
    let short_id = short.id().clone();
    assert_eq!(short.finished().await, RevealOutcome::Completed);

    assert_eq!(
        session.transcript().lock().await.get(&short_id).unwrap().content,
        "short"
    );
    // The session stays usable.
    session.set_input("");
    assert!(session.submit().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_new_selection_replaces_pending_attachment() {
    let mut session = ChatSession::new(ScriptedTransport::new(&[]));
    session.select_attachment(cat_png()).await;
    let dog = PendingAttachment::new(vec![9], "image/jpeg", "dog.jpg");
    session.select_attachment(dog.clone()).await;

    assert_eq!(session.pending_attachment(), Some(&dog));
    let transcript = session.transcript();
    let transcript = transcript.lock().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.entries()[1].content, "Selected File: dog.jpg");
}

#[tokio::test(start_paused = true)]
async fn test_selection_made_during_request_survives_its_completion() {
    let transport = Arc::new(GatedTransport {
        gate: Notify::new(),
        requests: Mutex::new(Vec::new()),
    });
    let mut session = ChatSession::new(transport.clone());

    session.select_attachment(cat_png()).await;
    session.set_input("first");
    let exchange = session.submit().await.unwrap();
    assert!(session.pending_attachment().is_none());

    // Picked while the first request is still waiting on the relay.
    let dog = PendingAttachment::new(vec![9], "image/jpeg", "dog.jpg");
    session.select_attachment(dog.clone()).await;

    transport.gate.notify_one();
    finish(exchange.await.unwrap()).await;

    assert_eq!(session.pending_attachment(), Some(&dog));
    let requests = transport.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].file, Some(cat_png()));
}
