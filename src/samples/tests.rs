use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

use super::todos::{Query, TodoStore, live_view};
use crate::config::ViewSettings;
use crate::connection::{Connection, Framing};
use crate::protocol::{FrameContext, LiveView};
use crate::transport::RequestInfo;
use crate::utils::LiveError;

type Fixture = (LiveView, Arc<TodoStore>, FrameContext, mpsc::UnboundedReceiver<WsMessage>);

fn setup() -> Fixture {
    setup_with(ViewSettings::default())
}

fn setup_with(settings: ViewSettings) -> Fixture {
    let db = Arc::new(TodoStore::new());
    let view = live_view(settings, db.clone());
    let req = RequestInfo::new("/").with_header("sec-websocket-key", "abc");
    let frame = view.connect(&req, 1);
    let (tx, rx) = mpsc::unbounded_channel();
    let topic = frame.topic.clone().unwrap();
    view.registry().subscribe(&topic, Connection::new(tx, Framing::Text));
    (view, db, frame, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<WsMessage>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        let WsMessage::Text(text) = msg else {
            panic!("expected text frame, got {msg:?}");
        };
        let parsed: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        out.push(parsed["message"].as_str().unwrap().to_string());
    }
    out
}

#[tokio::test]
async fn insert_renders_the_list_and_toggles_loading() {
    let (view, db, frame, mut rx) = setup();

    view.handle_frame(
        &frame,
        br#"{"id":"insert","action":"replace","target":"todos","template":"todos","params":{"text":"buy milk"}}"#,
    )
    .await
    .unwrap();

    let messages = drain(&mut rx);
    assert_eq!(messages.len(), 4);
    assert!(messages[0].contains(r#"target="glv-error""#));
    assert!(messages[1].contains(r#"action="update" target="new_todo""#));
    assert!(messages[1].contains("disabled"));
    assert!(messages[2].contains(r#"action="replace" target="todos""#));
    assert!(messages[2].contains("buy milk"));
    assert!(!messages[3].contains("disabled"));
    assert_eq!(db.count(), 1);
    assert!(frame.store.get("loading").is_none());
}

#[tokio::test]
async fn short_text_is_rejected_with_a_user_message() {
    let (view, db, frame, mut rx) = setup();

    let err = view
        .handle_frame(&frame, br#"{"id":"insert","params":{"text":"ab"}}"#)
        .await
        .unwrap_err();

    match err {
        LiveError::Handler { id, message } => {
            assert_eq!(id, "insert");
            assert_eq!(message, "minimum text size is 3");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let messages = drain(&mut rx);
    assert!(messages.last().unwrap().contains("minimum text size is 3"));
    assert_eq!(db.count(), 0);
}

#[tokio::test]
async fn list_pages_through_todos() {
    let (view, db, frame, mut rx) = setup();
    for text in ["one", "two", "three", "four", "five"] {
        db.create(text);
    }

    view.handle_frame(
        &frame,
        br#"{"id":"list","action":"replace","target":"todos","template":"todos","params":{"offset":3,"limit":3,"order":"asc"}}"#,
    )
    .await
    .unwrap();

    let messages = drain(&mut rx);
    let list = messages.last().unwrap();
    assert!(list.contains("four"));
    assert!(list.contains("five"));
    assert!(!list.contains("three"));
    assert!(list.contains(r#"data-offset="0""#));

    let query: Query = serde_json::from_value(frame.store.get("query").unwrap()).unwrap();
    assert_eq!(query.offset, 3);
}

#[tokio::test]
async fn list_without_params_uses_the_default_query() {
    let (view, db, frame, mut rx) = setup();
    for text in ["one", "two", "three", "four"] {
        db.create(text);
    }

    view.handle_frame(
        &frame,
        br#"{"id":"list","action":"replace","target":"todos","template":"todos"}"#,
    )
    .await
    .unwrap();

    let list = drain(&mut rx).pop().unwrap();
    assert!(list.contains("three"));
    assert!(!list.contains("four"));
    assert!(list.contains(r#"data-offset="3""#));
}

fn update_body(id: &str, text: &str) -> String {
    serde_json::json!({
        "id": "update",
        "action": "replace",
        "target": format!("todo-{id}"),
        "template": "todo-item",
        "params": {"id": id, "text": text},
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn update_flash_uses_the_configured_duration() {
    let (view, db, frame, mut rx) = setup_with(ViewSettings {
        flash_duration_ms: 500,
        ..ViewSettings::default()
    });
    let todo = db.create("buy milk");

    view.handle_frame(&frame, update_body(&todo.id, "buy bread").as_bytes())
        .await
        .unwrap();
    assert_eq!(drain(&mut rx).len(), 3);

    tokio::time::sleep(Duration::from_millis(600)).await;
    tokio::task::yield_now().await;
    let removal = drain(&mut rx);
    assert_eq!(removal.len(), 1);
    assert!(removal[0].contains(r#"action="remove""#));
}

#[tokio::test(start_paused = true)]
async fn update_flashes_saved_and_removes_it_later() {
    let (view, db, frame, mut rx) = setup();
    let todo = db.create("buy milk");

    view.handle_frame(&frame, update_body(&todo.id, "buy oat milk").as_bytes())
        .await
        .unwrap();

    let messages = drain(&mut rx);
    assert_eq!(messages.len(), 3);
    assert!(messages[1].contains(r#"action="append" target="glv-flash""#));
    assert!(messages[1].contains("saved"));
    assert!(messages[2].contains("buy oat milk"));
    assert_eq!(frame.store.get("message"), Some(serde_json::json!("saved")));
    assert!(frame.store.get("flash_id").is_none());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(drain(&mut rx).is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;
    tokio::task::yield_now().await;
    let removal = drain(&mut rx);
    assert_eq!(removal.len(), 1);
    assert!(removal[0].contains(r#"action="remove""#));
}

#[tokio::test]
async fn delete_of_unknown_todo_sets_the_error_banner() {
    let (view, _db, frame, mut rx) = setup();

    let err = view
        .handle_frame(&frame, br#"{"id":"delete","params":{"id":"nope"}}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, LiveError::Handler { ref message, .. } if message == "error deleting todo"));
    assert!(drain(&mut rx).last().unwrap().contains("error deleting todo"));
}

#[tokio::test]
async fn delete_refreshes_the_list() {
    let (view, db, frame, mut rx) = setup();
    let keep = db.create("keep");
    let gone = db.create("gone");
    let body = serde_json::json!({
        "id": "delete",
        "action": "replace",
        "target": "todos",
        "template": "todos",
        "params": {"id": gone.id},
    });

    view.handle_frame(&frame, body.to_string().as_bytes())
        .await
        .unwrap();

    let list = drain(&mut rx).pop().unwrap();
    assert!(list.contains(&keep.id));
    assert!(!list.contains(&gone.id));
    assert_eq!(db.count(), 1);
}

#[tokio::test]
async fn validate_input_shows_a_hint_that_is_not_persisted() {
    let (view, _db, frame, mut rx) = setup();

    view.handle_frame(&frame, br#"{"id":"validate_input","params":{"text":"a"}}"#)
        .await
        .unwrap();

    let hint = drain(&mut rx).pop().unwrap();
    assert!(hint.contains("minimum text length is 3"));
    assert!(frame.store.get("new_todo_error").is_none());
}

#[test]
fn page_renders_the_layout_with_current_todos() {
    let db = Arc::new(TodoStore::new());
    db.create("water plants");
    let view = live_view(ViewSettings::default(), db);

    let page = view.render_page(&RequestInfo::new("/"), 1);

    assert_eq!(page.status, 200);
    assert!(page.body.contains(r#"<div id="glv-error"></div>"#));
    assert!(page.body.contains("water plants"));
}
