use crate::protocol::GatewayEvent;
use crate::session::events::{EventDispatcher, EventHandler, dispatch};
use crate::session::{ConnectionStatus, EventName};
use crate::tests::support::Harness;

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;

fn event(name: &str) -> GatewayEvent {
    GatewayEvent {
        event: name.to_string(),
        payload: None,
        seq: None,
        state_version: None,
    }
}

fn recorder(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<EventHandler> {
    let log = Arc::clone(log);
    Arc::new(move |_: &GatewayEvent| log.lock().unwrap().push(label))
}

/// **VALUE**: Verifies exact-name handlers run before wildcard handlers, each group in
/// registration order.
///
/// **WHY THIS MATTERS**: UI code registers a wildcard logger and specific handlers;
/// the specific ones must see the event first.
///
/// **BUG THIS CATCHES**: Would catch a HashMap-ordered or wildcard-first dispatch.
#[test]
fn given_named_and_wildcard_handlers_when_dispatched_then_named_first_in_order() {
    // GIVEN: Two named handlers and one wildcard, registered interleaved
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Mutex::new(EventDispatcher::new());
    {
        let mut d = dispatcher.lock().unwrap();
        d.subscribe(EventName::Wildcard, recorder("any", &log));
        d.subscribe("chat".into(), recorder("chat-1", &log));
        d.subscribe("chat".into(), recorder("chat-2", &log));
    }

    // WHEN: A chat event is dispatched
    let delivered = dispatch(&dispatcher, &event("chat"));

    // THEN: Named handlers first, then wildcard
    assert_eq!(delivered, 3);
    assert_eq!(*log.lock().unwrap(), ["chat-1", "chat-2", "any"]);
}

/// **VALUE**: Verifies an event literally named `*` does not double-deliver to
/// wildcard handlers.
///
/// **BUG THIS CATCHES**: Would catch wildcard handlers being stored under the `"*"`
/// key and run twice for such an event.
#[test]
fn given_event_named_star_when_dispatched_then_wildcard_runs_once() {
    // GIVEN: A handler for the name "*" and a wildcard handler
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Mutex::new(EventDispatcher::new());
    {
        let mut d = dispatcher.lock().unwrap();
        d.subscribe(EventName::Wildcard, recorder("any", &log));
        d.subscribe("*".into(), recorder("star", &log));
    }

    // WHEN: An event named "*" is dispatched
    dispatch(&dispatcher, &event("*"));

    // THEN: Each handler ran exactly once
    assert_eq!(*log.lock().unwrap(), ["star", "any"]);
}

/// **VALUE**: Verifies a panicking handler does not stop the rest.
///
/// **WHY THIS MATTERS**: Handlers are application code. One bug in them must not
/// silence every other subscriber, or take down the session task.
///
/// **BUG THIS CATCHES**: Would catch removal of the per-handler panic isolation.
#[test]
fn given_panicking_handler_when_dispatched_then_following_handlers_still_run() {
    // GIVEN: A panicking handler followed by a recording one
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Mutex::new(EventDispatcher::new());
    {
        let mut d = dispatcher.lock().unwrap();
        d.subscribe("tick".into(), Arc::new(|_: &GatewayEvent| panic!("handler bug")));
        d.subscribe("tick".into(), recorder("after", &log));
    }

    // WHEN: Dispatching
    dispatch(&dispatcher, &event("tick"));

    // THEN: The second handler still ran
    assert_eq!(*log.lock().unwrap(), ["after"]);
}

/// **VALUE**: Verifies unsubscribing removes exactly one handler and cleans up empty
/// name entries.
///
/// **BUG THIS CATCHES**: Would catch `off` removing every handler for the name.
#[test]
fn given_two_handlers_when_one_unsubscribed_then_other_remains() {
    // GIVEN: Two handlers for the same name
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = EventDispatcher::new();
    let first = dispatcher.subscribe("chat".into(), recorder("first", &log));
    let second = dispatcher.subscribe("chat".into(), recorder("second", &log));

    // WHEN: Removing the first, twice
    assert!(dispatcher.unsubscribe(&first));
    assert!(!dispatcher.unsubscribe(&first));

    // THEN: Only the second remains, then nothing
    assert_eq!(dispatcher.handler_count(&EventName::from("chat")), 1);
    assert!(dispatcher.unsubscribe(&second));
    assert_eq!(dispatcher.handler_count(&EventName::from("chat")), 0);
    assert!(dispatcher.handlers_for("chat").is_empty());
}

/// **VALUE**: Verifies gateway events reach handlers registered on the session, and
/// malformed frames in between are dropped without effect.
///
/// **WHY THIS MATTERS**: Non-JSON garbage from a proxy must neither disconnect the
/// session nor reach handlers.
///
/// **BUG THIS CATCHES**: Would catch a decode failure tearing down the transport or
/// being dispatched as an event.
#[tokio::test(start_paused = true)]
async fn given_connected_session_when_malformed_then_valid_event_then_only_valid_delivered() {
    // GIVEN: A connected session with a chat handler
    let mut harness = Harness::new();
    let link = harness.connected().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    harness.session.on("chat", move |event: &GatewayEvent| {
        let _ = tx.send(event.payload.clone());
    });

    // WHEN: Garbage arrives, then a real event
    link.push_text("not json at all");
    link.push_text(r#"{"type":"mystery"}"#);
    link.push_event("chat", json!({ "text": "hello" }));

    // THEN: Only the real event is delivered and the session stays connected
    assert_eq!(rx.recv().await.unwrap(), Some(json!({ "text": "hello" })));
    assert!(rx.try_recv().is_err());
    assert_eq!(harness.session.status(), ConnectionStatus::Connected);
}

/// **VALUE**: Verifies `on_any` handlers see every event after the named ones, and
/// `off` stops delivery.
///
/// **BUG THIS CATCHES**: Would catch the session handle registering wildcard handlers
/// under the literal name `"*"`.
#[tokio::test(start_paused = true)]
async fn given_session_handlers_when_events_arrive_then_wildcard_after_named_and_off_stops() {
    // GIVEN: A named and a wildcard handler on a connected session
    let mut harness = Harness::new();
    let link = harness.connected().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let named_tx = tx.clone();
    let named = harness.session.on("presence", move |_: &GatewayEvent| {
        let _ = named_tx.send("named".to_string());
    });
    harness.session.on_any(move |event: &GatewayEvent| {
        let _ = tx.send(format!("any:{}", event.event));
    });

    // WHEN: A presence event arrives, then the named handler is removed and another arrives
    link.push_event("presence", json!({}));
    assert_eq!(rx.recv().await.unwrap(), "named");
    assert_eq!(rx.recv().await.unwrap(), "any:presence");
    assert!(harness.session.off(&named));
    link.push_event("presence", json!({}));

    // THEN: Only the wildcard sees the second one
    assert_eq!(rx.recv().await.unwrap(), "any:presence");
    assert!(rx.try_recv().is_err());
}
