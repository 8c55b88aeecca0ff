use crate::agent::CalcAgent;
use crate::models::websocket::{ ClientMessage, ServerMessage };
use crate::view::{ EventSink, UiEvent };

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::sync::Mutex;
use tokio::sync::mpsc::{ unbounded_channel, UnboundedSender };
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Message;

use futures::{ SinkExt, StreamExt };
use log::{ debug, error, info, warn };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

/// Turns agent events into frames for one client.
struct ConnectionSink {
    out: UnboundedSender<Message>,
}

impl ConnectionSink {
    fn send(&self, frame: &ServerMessage) {
        match serde_json::to_string(frame) {
            Ok(json) => {
                // receiver gone means the client already disconnected
                let _ = self.out.send(Message::Text(json));
            }
            Err(e) => error!("Failed to serialize frame: {}", e),
        }
    }
}

impl EventSink for ConnectionSink {
    fn emit(&mut self, event: UiEvent) {
        self.send(&ServerMessage::from(event));
    }
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    agent: Arc<Mutex<CalcAgent>>
)
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    info!("New WebSocket connection: {}", peer);

    let (mut tx, mut rx) = websocket.split();
    let (out_tx, mut out_rx) = unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = tx.send(frame).await {
                debug!("Writer for {} stopped: {}", peer, e);
                break;
            }
        }
    });

    let mut sink = ConnectionSink { out: out_tx };
    agent.lock().await.snapshot(&mut sink);

    while let Some(msg) = rx.next().await {
        let message = match msg {
            Ok(message) => message,
            Err(e) => {
                info!("WebSocket connection closed or errored for {}: {}", peer, e);
                break;
            }
        };

        if message.len() > MAX_MESSAGE_SIZE {
            warn!(
                "Message from {} exceeds size limit ({} > {})",
                peer,
                message.len(),
                MAX_MESSAGE_SIZE
            );
            sink.send(&ServerMessage::Error { message: "Message too large".to_string() });
            break;
        }

        match message {
            Message::Text(text) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_message) => {
                        let mut agent = agent.lock().await;
                        match client_message.into_command() {
                            Some(command) => agent.dispatch(command, &mut sink).await,
                            None => agent.snapshot(&mut sink),
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse message from {}: {}", peer, e);
                        sink.send(&ServerMessage::Error {
                            message: format!("Failed to parse message: {}", e),
                        });
                    }
                }
            }
            Message::Close(_) => {
                info!("Received close frame from {}", peer);
                break;
            }
            Message::Ping(ping_data) => {
                if sink.out.send(Message::Pong(ping_data)).is_err() {
                    break;
                }
            }
            Message::Pong(_) => {}
            Message::Binary(_) => {
                warn!("Ignoring binary message from {}", peer);
            }
            Message::Frame(_) => {}
        }
    }

    drop(sink);
    if let Err(e) = writer.await {
        error!("Writer task for {} failed: {}", peer, e);
    }
    info!("WebSocket connection closed for {}", peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ ConversationStore, MemoryStorage };
    use serde_json::Value;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{ accept_async, connect_async };

    async fn serve_one() -> (String, Arc<Mutex<CalcAgent>>) {
        let store = ConversationStore::open(Arc::new(MemoryStorage::new())).await.unwrap();
        let agent = Arc::new(Mutex::new(CalcAgent::with_store(store, true, Duration::ZERO)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shared = agent.clone();
        tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            handle_connection(peer, ws, shared).await;
        });

        (format!("ws://{}", addr), agent)
    }

    async fn next_json<S>(rx: &mut S) -> Value
        where S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin
    {
        loop {
            match rx.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn chat_frame_gets_processing_then_answer() {
        let (url, agent) = serve_one().await;
        let (client, _) = connect_async(url.as_str()).await.unwrap();
        let (mut tx, mut rx) = client.split();

        assert_eq!(next_json(&mut rx).await["type"], "clear");
        assert_eq!(next_json(&mut rx).await["type"], "sidebar");

        tx.send(Message::Text(r#"{"type":"chat","content":"square root of 16"}"#.into())).await.unwrap();

        let mut frames = Vec::new();
        loop {
            let frame = next_json(&mut rx).await;
            let done = frame["type"] == "sidebar" && frame["entries"].as_array().is_some_and(|e| !e.is_empty());
            frames.push(frame);
            if done {
                break;
            }
        }

        let types: Vec<&str> = frames.iter().filter_map(|f| f["type"].as_str()).collect();
        let processing = types.iter().position(|t| *t == "processing").unwrap();
        let done = types.iter().position(|t| *t == "processing_done").unwrap();
        assert!(processing < done);

        let answer = frames
            .iter()
            .find(|f| f["type"] == "message" && f["sender"] == "bot")
            .unwrap();
        assert_eq!(answer["text"], "Answer: 4");
        assert!(frames.iter().any(|f| f["type"] == "speak" && f["text"] == "Answer: 4"));

        assert_eq!(agent.lock().await.conversations().len(), 1);
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_and_connection_survives() {
        let (url, _agent) = serve_one().await;
        let (client, _) = connect_async(url.as_str()).await.unwrap();
        let (mut tx, mut rx) = client.split();
        next_json(&mut rx).await;
        next_json(&mut rx).await;

        tx.send(Message::Text("not json".into())).await.unwrap();
        assert_eq!(next_json(&mut rx).await["type"], "error");

        tx.send(Message::Text(r#"{"type":"toggle_voice"}"#.into())).await.unwrap();
        let notice = next_json(&mut rx).await;
        assert_eq!(notice["type"], "notice");
        assert_eq!(notice["message"], "Voice replies OFF");
    }
}
