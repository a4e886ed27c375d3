use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::client::IntoClientRequest;
use tungstenite::protocol::Message as WsMessage;

use super::handshake::viewer_cookie;
use super::{RequestInfo, resolve_topic, serve};
use crate::config::{TopicStrategy, ViewSettings};
use crate::protocol::{Changeset, LiveView, handler};
use crate::render::TemplateSet;
use crate::wire::Action;

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[test]
fn request_info_reads_headers_case_insensitively() {
    let req = RequestInfo::new("/todos")
        .with_header("Sec-WebSocket-Key", "abc==")
        .with_header("Cookie", "theme=dark; _glv_key_glv=9");
    assert_eq!(req.challenge_key(), Some("abc=="));
    assert_eq!(req.header("COOKIE"), Some("theme=dark; _glv_key_glv=9"));
    assert_eq!(req.cookie("_glv_key_glv"), Some("9"));
    assert_eq!(req.cookie("theme"), Some("dark"));
    assert_eq!(req.cookie("missing"), None);
}

#[test]
fn request_info_from_http_request() {
    let req = tungstenite::http::Request::builder()
        .uri("ws://localhost/samples/todos?page=2")
        .header("Sec-WebSocket-Key", "k")
        .body(())
        .unwrap();
    let info = RequestInfo::from_http(&req);
    assert_eq!(info.path, "/samples/todos");
    assert_eq!(info.query.as_deref(), Some("page=2"));
    assert_eq!(info.challenge_key(), Some("k"));
}

#[test]
fn handshake_topic_is_path_plus_key() {
    let req = RequestInfo::new("/samples/todos").with_header("Sec-WebSocket-Key", "xyz");
    assert_eq!(
        resolve_topic(TopicStrategy::Handshake, &req, 4),
        "_samples_todos_xyz"
    );
}

#[test]
fn handshake_topic_without_key_is_still_unique() {
    let req = RequestInfo::new("/t");
    let a = resolve_topic(TopicStrategy::Handshake, &req, 1);
    let b = resolve_topic(TopicStrategy::Handshake, &req, 1);
    assert_ne!(a, b);
    assert!(a.starts_with("_t_"));
}

#[test]
fn viewer_topic_is_path_plus_viewer() {
    let req = RequestInfo::new("/samples/todos").with_header("Sec-WebSocket-Key", "xyz");
    assert_eq!(
        resolve_topic(TopicStrategy::Viewer, &req, 4),
        "_samples_todos_4"
    );
}

#[test]
fn viewer_cookie_is_scoped_to_root() {
    assert_eq!(
        viewer_cookie("_glv_key_glv", 3),
        "_glv_key_glv=3; Path=/; HttpOnly; SameSite=Lax"
    );
}

fn templates() -> TemplateSet {
    TemplateSet::new()
        .fragment("todo-item", |_, d| {
            Ok(format!(
                "<li>{}</li>",
                d.get("text").and_then(|v| v.as_str()).unwrap_or_default()
            ))
        })
        .fixed("glv-error", "<div id=\"glv-error\"></div>")
}

fn todo_view(settings: ViewSettings, shared_topic: bool) -> LiveView {
    let builder = LiveView::builder(Arc::new(templates()))
        .settings(settings)
        .handler(
            "create",
            handler(|req, session| async move {
                let text = req.params["text"].as_str().unwrap_or_default().to_string();
                session.change(
                    Changeset::target(Action::Append, "todo-list", "todo-item").insert("text", text),
                );
                anyhow::Ok(())
            }),
        );
    if shared_topic {
        builder
            .topic_resolver(|_, _| Some("todos_abc".to_string()))
            .build()
    } else {
        builder.build()
    }
}

async fn start(view: LiveView) -> (String, Arc<LiveView>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let view = Arc::new(view);
    tokio::spawn(serve(listener, view.clone()));
    (format!("ws://{addr}/samples/todos"), view)
}

async fn next_message(ws: &mut Client) -> String {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("read error");
    let parsed: serde_json::Value = serde_json::from_slice(&msg.into_data()).unwrap();
    parsed["message"].as_str().unwrap().to_string()
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn change_fans_out_to_every_connection_on_the_topic() {
    let (url, view) = start(todo_view(ViewSettings::default(), true)).await;
    let (mut ws_a, _) = connect_async(url.as_str()).await.expect("client A connect");
    let (mut ws_b, _) = connect_async(url.as_str()).await.expect("client B connect");
    wait_for(|| view.registry().connection_count("todos_abc") == 2).await;

    let create = json!({"id": "create", "params": {"text": "buy milk"}}).to_string();
    ws_a.send(WsMessage::Text(create.into())).await.unwrap();

    for ws in [&mut ws_a, &mut ws_b] {
        assert!(next_message(ws).await.contains("glv-error"));
        let appended = next_message(ws).await;
        assert!(appended.contains(r#"action="append" target="todo-list""#));
        assert!(appended.contains("<li>buy milk</li>"));
    }
}

#[tokio::test]
async fn bad_frames_keep_the_connection_open() {
    let (url, view) = start(todo_view(ViewSettings::default(), true)).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    wait_for(|| view.registry().connection_count("todos_abc") == 1).await;

    ws.send(WsMessage::Text("not json".into())).await.unwrap();
    ws.send(WsMessage::Text(r#"{"id":"unknown"}"#.into())).await.unwrap();
    let create = json!({"id": "create", "params": {"text": "still here"}}).to_string();
    ws.send(WsMessage::Text(create.into())).await.unwrap();

    assert!(next_message(&mut ws).await.contains("glv-error"));
    assert!(next_message(&mut ws).await.contains("still here"));
}

#[tokio::test]
async fn new_viewer_gets_a_cookie() {
    let (url, _view) = start(todo_view(ViewSettings::default(), false)).await;
    let (_ws, response) = connect_async(url.as_str()).await.expect("connect");
    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("set-cookie header")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("_glv_key_glv="));
}

#[tokio::test]
async fn viewer_strategy_shares_topic_between_tabs() {
    let settings = ViewSettings {
        topic_strategy: TopicStrategy::Viewer,
        ..ViewSettings::default()
    };
    let (url, view) = start(todo_view(settings, false)).await;

    let tab = || {
        let mut req = url.as_str().into_client_request().unwrap();
        req.headers_mut()
            .insert("Cookie", "_glv_key_glv=77".parse().unwrap());
        req
    };
    let (mut ws_a, response) = connect_async(tab()).await.expect("tab A");
    assert!(response.headers().get("set-cookie").is_none());
    let (mut ws_b, _) = connect_async(tab()).await.expect("tab B");
    wait_for(|| view.registry().connection_count("_samples_todos_77") == 2).await;

    let create = json!({"id": "create", "params": {"text": "shared"}}).to_string();
    ws_b.send(WsMessage::Text(create.into())).await.unwrap();
    assert!(next_message(&mut ws_a).await.contains("glv-error"));
    assert!(next_message(&mut ws_a).await.contains("shared"));
}

#[tokio::test]
async fn disconnect_unsubscribes_and_drops_empty_topic() {
    let (url, view) = start(todo_view(ViewSettings::default(), true)).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    wait_for(|| view.registry().contains("todos_abc")).await;

    ws.close(None).await.unwrap();
    wait_for(|| !view.registry().contains("todos_abc")).await;
}

#[tokio::test]
async fn shutdown_closes_connections() {
    let (url, view) = start(todo_view(ViewSettings::default(), true)).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    wait_for(|| view.registry().contains("todos_abc")).await;

    view.shutdown();
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for close");
    assert!(matches!(msg, Some(Ok(WsMessage::Close(_))) | None));
}
