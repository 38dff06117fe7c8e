//! Integration tests for the call-signaling relay: WebSocket auth, offer/accept
//! routing, silent drops, disconnect cleanup, and malformed-frame isolation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use switchboard_server::client::SignalClient;
use switchboard_server::signaling::protocol::ServerFrame;
use switchboard_server::signaling::registry::CallRegistry;

/// Helper: start the server on a random port and return (http base, ws base).
async fn start_test_server() -> (String, String) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = switchboard_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = switchboard_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = switchboard_server::state::AppState {
        db,
        jwt_secret,
        connections: switchboard_server::ws::new_connection_map(),
        calls: Arc::new(CallRegistry::new()),
    };

    let app = switchboard_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), format!("ws://{}", addr))
}

/// Register an account and return its access token.
async fn register_account(base_url: &str, name: &str, email: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({"name": name, "email": email, "password": "correct-horse"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Registration failed for {}", email);
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Receive the next frame, failing the test if nothing arrives in time.
async fn recv(client: &mut SignalClient) -> ServerFrame {
    tokio::time::timeout(Duration::from_secs(2), client.next_event())
        .await
        .expect("Timed out waiting for a signaling frame")
        .expect("WebSocket error")
        .expect("Connection closed unexpectedly")
}

/// Assert that no frame arrives within a grace window.
async fn expect_silence(client: &mut SignalClient) {
    let result = tokio::time::timeout(Duration::from_millis(300), client.next_event()).await;
    assert!(
        result.is_err(),
        "Expected no frame, but received: {:?}",
        result
    );
}

#[tokio::test]
async fn test_ws_rejects_invalid_token() {
    let (_base_url, ws_url) = start_test_server().await;

    let (ws_stream, _) =
        tokio_tungstenite::connect_async(format!("{}/ws?token=garbage", ws_url))
            .await
            .expect("Upgrade itself should succeed");
    let (_, mut read) = ws_stream.split();

    // Server upgrades, then immediately closes with 4002 (token invalid)
    match read.next().await {
        Some(Ok(Message::Close(Some(frame)))) => {
            assert_eq!(u16::from(frame.code), 4002);
        }
        other => panic!("Expected close frame, got {:?}", other),
    }
}

/// The full call scenario: offer → accept → counterpart disconnect → cleanup.
#[tokio::test]
async fn test_call_scenario_offer_accept_disconnect() {
    let (base_url, ws_url) = start_test_server().await;
    let alice_token = register_account(&base_url, "Alice", "alice@example.com").await;
    let bob_token = register_account(&base_url, "Bob", "bob@example.com").await;

    let mut alice = SignalClient::connect(&ws_url, &alice_token).await.unwrap();
    let mut bob = SignalClient::connect(&ws_url, &bob_token).await.unwrap();
    alice.register("alice").await.unwrap();
    bob.register("bob").await.unwrap();
    // Registration is fire-and-forget; give the relay a beat to process it
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Alice calls Bob: exactly one delivery, attributed to alice
    alice.offer("alice", "bob", json!("sdp1")).await.unwrap();
    assert_eq!(
        recv(&mut bob).await,
        ServerFrame::Offer {
            from: "alice".to_string(),
            payload: json!("sdp1"),
        }
    );
    expect_silence(&mut alice).await;

    // Bob answers: the accept payload comes back to the caller
    bob.accept("alice", json!("sdp2")).await.unwrap();
    assert_eq!(
        recv(&mut alice).await,
        ServerFrame::Accept {
            payload: json!("sdp2"),
        }
    );

    // Bob disconnects; his registry entry must not outlive the connection
    bob.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.offer("alice", "bob", json!("sdp3")).await.unwrap();
    expect_silence(&mut alice).await;

    // An end to a departed peer is silently dropped, never an error
    alice.end("bob").await.unwrap();
    expect_silence(&mut alice).await;

    // Bob re-registers on a fresh connection and is reachable again
    let mut bob2 = SignalClient::connect(&ws_url, &bob_token).await.unwrap();
    bob2.register("bob").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.offer("alice", "bob", json!("sdp4")).await.unwrap();
    assert_eq!(
        recv(&mut bob2).await,
        ServerFrame::Offer {
            from: "alice".to_string(),
            payload: json!("sdp4"),
        }
    );
}

#[tokio::test]
async fn test_reject_and_end_are_relayed() {
    let (base_url, ws_url) = start_test_server().await;
    let alice_token = register_account(&base_url, "Alice", "alice@example.com").await;
    let bob_token = register_account(&base_url, "Bob", "bob@example.com").await;

    let mut alice = SignalClient::connect(&ws_url, &alice_token).await.unwrap();
    let mut bob = SignalClient::connect(&ws_url, &bob_token).await.unwrap();
    alice.register("alice").await.unwrap();
    bob.register("bob").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.offer("alice", "bob", json!("sdp1")).await.unwrap();
    let ServerFrame::Offer { from, .. } = recv(&mut bob).await else {
        panic!("Expected an offer");
    };

    // Bob declines; Alice hears a bare reject
    bob.reject(&from).await.unwrap();
    assert_eq!(recv(&mut alice).await, ServerFrame::Reject);

    // Second attempt, answered then hung up by Alice
    alice.offer("alice", "bob", json!("sdp2")).await.unwrap();
    recv(&mut bob).await;
    bob.accept("alice", json!("sdp3")).await.unwrap();
    recv(&mut alice).await;

    alice.end("bob").await.unwrap();
    assert_eq!(recv(&mut bob).await, ServerFrame::End);
}

#[tokio::test]
async fn test_offer_to_unknown_target_is_dropped_silently() {
    let (base_url, ws_url) = start_test_server().await;
    let alice_token = register_account(&base_url, "Alice", "alice@example.com").await;
    let carol_token = register_account(&base_url, "Carol", "carol@example.com").await;

    let mut alice = SignalClient::connect(&ws_url, &alice_token).await.unwrap();
    alice.register("alice").await.unwrap();

    // Nobody is registered as "ghost": zero deliveries, no error to the caller
    alice.offer("alice", "ghost", json!("sdp1")).await.unwrap();
    expect_silence(&mut alice).await;

    // The relay and the connection are still fully functional afterwards
    let mut carol = SignalClient::connect(&ws_url, &carol_token).await.unwrap();
    carol.register("carol").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.offer("alice", "carol", json!("sdp2")).await.unwrap();
    assert_eq!(
        recv(&mut carol).await,
        ServerFrame::Offer {
            from: "alice".to_string(),
            payload: json!("sdp2"),
        }
    );
}

#[tokio::test]
async fn test_malformed_frame_isolated_to_offending_connection() {
    let (base_url, ws_url) = start_test_server().await;
    let alice_token = register_account(&base_url, "Alice", "alice@example.com").await;
    let bob_token = register_account(&base_url, "Bob", "bob@example.com").await;

    // Raw socket so we can send garbage
    let (ws_stream, _) = tokio_tungstenite::connect_async(format!(
        "{}/ws?token={}",
        ws_url, alice_token
    ))
    .await
    .unwrap();
    let (mut write, mut read) = ws_stream.split();

    write
        .send(Message::Text("this is not json".into()))
        .await
        .unwrap();

    // The relay answers with an error frame and keeps the connection open
    match tokio::time::timeout(Duration::from_secs(2), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(frame["type"], "error");
        }
        other => panic!("Expected error frame, got {:?}", other),
    }

    // Same connection can still register and receive calls
    write
        .send(Message::Text(
            json!({"type": "register", "identity": "alice"}).to_string().into(),
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut bob = SignalClient::connect(&ws_url, &bob_token).await.unwrap();
    bob.register("bob").await.unwrap();
    bob.offer("bob", "alice", json!("sdp1")).await.unwrap();

    match tokio::time::timeout(Duration::from_secs(2), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(frame["type"], "offer");
            assert_eq!(frame["from"], "bob");
        }
        other => panic!("Expected offer after recovery, got {:?}", other),
    }
}

/// Re-registering an identity from a second connection supersedes the first
/// (last-writer-wins), and closing the superseding connection clears the
/// binding entirely rather than falling back to the stale one.
#[tokio::test]
async fn test_reregistration_supersedes_older_connection() {
    let (base_url, ws_url) = start_test_server().await;
    let alice_token = register_account(&base_url, "Alice", "alice@example.com").await;
    let bob_token = register_account(&base_url, "Bob", "bob@example.com").await;

    let mut alice_old = SignalClient::connect(&ws_url, &alice_token).await.unwrap();
    let mut alice_new = SignalClient::connect(&ws_url, &alice_token).await.unwrap();
    let mut bob = SignalClient::connect(&ws_url, &bob_token).await.unwrap();

    alice_old.register("alice").await.unwrap();
    bob.register("bob").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    alice_new.register("alice").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Only the most recent registration receives the call
    bob.offer("bob", "alice", json!("sdp1")).await.unwrap();
    assert_eq!(
        recv(&mut alice_new).await,
        ServerFrame::Offer {
            from: "bob".to_string(),
            payload: json!("sdp1"),
        }
    );
    expect_silence(&mut alice_old).await;

    // Closing the live binding leaves "alice" unreachable — the superseded
    // connection must not resurface
    alice_new.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    bob.offer("bob", "alice", json!("sdp2")).await.unwrap();
    expect_silence(&mut alice_old).await;
    expect_silence(&mut bob).await;
}
