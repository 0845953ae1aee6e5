// tests/ws_live.rs
//
// The router served on a real loopback socket with a websocket client, so
// the axum adapter (text, binary, ping and close frames) is exercised end to
// end. Runs on the real clock; the cadence is shortened through StreamConfig.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value as Json;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use next_best_action::api::{self, AppState};
use next_best_action::config::StreamConfig;
use next_best_action::Catalogs;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn serve(config: StreamConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::router(AppState::new(config, Catalogs::builtin()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Long interval so only the first tick can arrive during a test.
fn slow_ticks() -> StreamConfig {
    StreamConfig {
        initial_wait_ms: 200,
        drain_poll_ms: 10,
        tick_interval_ms: 60_000,
        ..StreamConfig::default()
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

/// Next text frame as JSON, skipping control frames.
async fn next_tick(ws: &mut Client) -> Json {
    loop {
        let frame = timeout(WAIT, ws.next())
            .await
            .expect("tick within deadline")
            .expect("stream open")
            .expect("frame ok");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn text_preferences_shape_the_first_tick() {
    let addr = serve(slow_ticks()).await;
    let mut ws = connect(addr).await;
    ws.send(Message::text(r#"{"dataSources":["gtm"],"channels":["sms"]}"#))
        .await
        .unwrap();

    let tick = next_tick(&mut ws).await;
    assert_eq!(tick["rightChannel"]["id"], "sms");
    let sources: Vec<&String> = tick["dataSources"].as_object().unwrap().keys().collect();
    assert_eq!(sources, vec!["gtm"]);
}

#[tokio::test]
async fn close_frame_ends_the_session_without_more_ticks() {
    let addr = serve(slow_ticks()).await;
    let mut ws = connect(addr).await;
    ws.send(Message::text(r#"{"channels":["email"]}"#)).await.unwrap();
    let tick = next_tick(&mut ws).await;
    assert_eq!(tick["rightChannel"]["id"], "email");

    ws.send(Message::Close(None)).await.unwrap();

    // Whatever follows must be the end of the stream, never another tick.
    let drained = timeout(WAIT, async {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Text(text)) => panic!("tick after close: {text}"),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "server kept the session open after close");
}

#[tokio::test]
async fn binary_preferences_are_read_as_text() {
    let addr = serve(slow_ticks()).await;
    let mut ws = connect(addr).await;
    ws.send(Message::binary(br#"{"channels":["whatsapp"]}"#.to_vec()))
        .await
        .unwrap();

    let tick = next_tick(&mut ws).await;
    assert_eq!(tick["rightChannel"]["id"], "whatsapp");
}

#[tokio::test]
async fn ping_before_preferences_does_not_count_as_a_message() {
    let addr = serve(slow_ticks()).await;
    let mut ws = connect(addr).await;
    ws.send(Message::Ping(b"hi".to_vec().into())).await.unwrap();
    ws.send(Message::text(r#"{"channels":["ads"]}"#)).await.unwrap();

    let tick = next_tick(&mut ws).await;
    assert_eq!(tick["rightChannel"]["id"], "ads");
}

#[tokio::test]
async fn silent_client_gets_select_all_after_initial_wait() {
    let addr = serve(slow_ticks()).await;
    let mut ws = connect(addr).await;

    let tick = next_tick(&mut ws).await;
    let mut sources: Vec<&String> = tick["dataSources"].as_object().unwrap().keys().collect();
    sources.sort();
    assert_eq!(sources, vec!["facebook_pixel", "google_ads_tag", "gtm"]);
}
