// Scripted websocket server used by the integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

// Upper bound for any single wait so a broken client fails the test instead of hanging it.
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub enum Step {
    // Push one envelope to the client.
    Send(Value),
    // Read client frames until one with this `type` arrives.
    AwaitClient(&'static str),
    // Start the closing handshake.
    Close,
}

// Bind an ephemeral port, serve exactly one client with `script`, and hand back
// the client URL plus a handle resolving to every JSON frame the client sent.
pub async fn spawn_server(script: Vec<Step>) -> (String, JoinHandle<Vec<Value>>) {
    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    // Capture the exact address that was assigned by the OS.
    let addr = listener.local_addr().expect("get local addr");

    let handle = tokio::spawn(async move {
        let (stream, _) = timeout(STEP_TIMEOUT, listener.accept())
            .await
            .expect("client connected in time")
            .expect("accept");
        let mut socket = accept_async(stream).await.expect("websocket handshake");
        let mut received = Vec::new();

        for step in script {
            match step {
                Step::Send(value) => socket
                    .send(Message::Text(value.to_string().into()))
                    .await
                    .expect("send scripted frame"),
                Step::AwaitClient(kind) => loop {
                    let message = timeout(STEP_TIMEOUT, socket.next())
                        .await
                        .expect("client frame in time")
                        .expect("client stream open")
                        .expect("client frame");
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let value: Value = serde_json::from_str(text.as_str()).expect("client json");
                    let matched = value["type"] == kind;
                    received.push(value);
                    if matched {
                        break;
                    }
                },
                Step::Close => socket.close(None).await.expect("send close"),
            }
        }

        // Keep reading until the client finishes the closing handshake.
        while let Ok(Some(Ok(message))) = timeout(STEP_TIMEOUT, socket.next()).await {
            if let Message::Text(text) = message {
                if let Ok(value) = serde_json::from_str(text.as_str()) {
                    received.push(value);
                }
            }
        }
        received
    });

    (format!("ws://{addr}/websocket"), handle)
}
