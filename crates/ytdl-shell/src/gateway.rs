use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;
use ytdl_core::{Endpoint, EnginePacket, PushEvent, SocketPacket};

const EVENT_QUEUE_CAPACITY: usize = 256;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Connected { sid: String },
    Disconnected,
    Push(PushEvent),
}

/// Owns the live connection to one backend endpoint.
///
/// The connection task lives exactly as long as this value: dropping the
/// gateway aborts the task and closes the socket. Events from a dropped
/// gateway can never reach its successor because the channel goes with it.
pub struct Gateway {
    endpoint: Endpoint,
    timing: Timing,
    events: mpsc::Receiver<GatewayEvent>,
    task: JoinHandle<()>,
}

#[derive(Clone, Copy, Debug)]
struct Timing {
    handshake: Duration,
    initial_backoff: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            handshake: HANDSHAKE_TIMEOUT,
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

impl Gateway {
    pub fn connect(endpoint: Endpoint) -> Self {
        Self::spawn(endpoint, Timing::default())
    }

    fn spawn(endpoint: Endpoint, timing: Timing) -> Self {
        let (tx, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        info!(endpoint = %endpoint, "gateway_connect");
        let task = tokio::spawn(connection_loop(endpoint.clone(), timing, tx));
        Self {
            endpoint,
            timing,
            events,
            task,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Keeps the live connection for an unchanged endpoint; otherwise tears
    /// it down before connecting to the new one.
    pub fn retarget(self, endpoint: Endpoint) -> Self {
        if self.endpoint == endpoint {
            return self;
        }
        info!(from = %self.endpoint(), to = %endpoint, "gateway_retarget");
        let timing = self.timing;
        self.shutdown();
        Self::spawn(endpoint, timing)
    }

    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        self.events.recv().await
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum SessionEnd {
    Dropped { established: bool },
    ReceiverGone,
}

async fn connection_loop(endpoint: Endpoint, timing: Timing, tx: mpsc::Sender<GatewayEvent>) {
    let url = match Url::parse(&endpoint.websocket_url()) {
        Ok(url) => url,
        Err(err) => {
            warn!("gateway_invalid_endpoint: {endpoint}: {err}");
            return;
        }
    };
    let mut backoff = timing.initial_backoff;

    loop {
        match run_session(&url, timing.handshake, &tx).await {
            SessionEnd::ReceiverGone => return,
            SessionEnd::Dropped { established } => {
                if established {
                    backoff = timing.initial_backoff;
                    if tx.send(GatewayEvent::Disconnected).await.is_err() {
                        return;
                    }
                }
            }
        }
        sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

async fn run_session(
    url: &Url,
    handshake: Duration,
    tx: &mpsc::Sender<GatewayEvent>,
) -> SessionEnd {
    let (mut ws, _) = match timeout(handshake, connect_async(url.as_str())).await {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            warn!("gateway_connect_error: {err}");
            return SessionEnd::Dropped { established: false };
        }
        Err(_) => {
            warn!("gateway_upgrade_timeout: {}ms", handshake.as_millis());
            return SessionEnd::Dropped { established: false };
        }
    };
    let mut liveness = handshake;
    let mut established = false;

    loop {
        let frame = match timeout(liveness, ws.next()).await {
            Err(_) => {
                warn!("gateway_liveness_timeout: {}ms", liveness.as_millis());
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                warn!("gateway_read_error: {err}");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let packet = match EnginePacket::decode(&text) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("gateway_decode_error: {err}");
                continue;
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                liveness = handshake.liveness_window();
                let connect = EnginePacket::Message(SocketPacket::connect().encode()).encode();
                if ws.send(Message::Text(connect)).await.is_err() {
                    break;
                }
            }
            EnginePacket::Ping(data) => {
                let pong = EnginePacket::Pong(data).encode();
                if ws.send(Message::Text(pong)).await.is_err() {
                    break;
                }
            }
            EnginePacket::Close => break,
            EnginePacket::Message(body) => match SocketPacket::decode(&body) {
                Ok(SocketPacket::Connect { data, .. }) => {
                    established = true;
                    let sid = data
                        .as_ref()
                        .and_then(|value| value.get("sid"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    info!(sid = %sid, "gateway_connected");
                    if tx.send(GatewayEvent::Connected { sid }).await.is_err() {
                        return SessionEnd::ReceiverGone;
                    }
                }
                Ok(SocketPacket::ConnectError { data, .. }) => {
                    warn!(
                        "gateway_connect_refused: {}",
                        data.map(|value| value.to_string()).unwrap_or_default()
                    );
                    break;
                }
                Ok(SocketPacket::Disconnect { .. }) => break,
                Ok(packet) => {
                    if let Some(event) = packet.into_push_event() {
                        if tx.send(GatewayEvent::Push(event)).await.is_err() {
                            return SessionEnd::ReceiverGone;
                        }
                    }
                }
                Err(err) => warn!("gateway_decode_error: {err}"),
            },
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }
    }

    let _ = ws.close(None).await;
    SessionEnd::Dropped { established }
}

fn next_backoff(current: Duration) -> Duration {
    let next = current + current;
    if next > MAX_BACKOFF {
        MAX_BACKOFF
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::accept_async;

    const OPEN: &str =
        r#"0{"sid":"engine-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
    const WAIT: Duration = Duration::from_secs(5);

    async fn next_event(gateway: &mut Gateway) -> GatewayEvent {
        timeout(WAIT, gateway.recv())
            .await
            .expect("event before timeout")
            .expect("gateway channel open")
    }

    fn push(name: &str, payload: serde_json::Value) -> GatewayEvent {
        GatewayEvent::Push(PushEvent::new(name, payload))
    }

    #[tokio::test]
    async fn delivers_events_in_backend_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("ws handshake");
            let mut received = Vec::new();
            ws.send(Message::Text(OPEN.to_string())).await.expect("open");
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                received.push(text);
            }
            ws.send(Message::Text(r#"40{"sid":"sock-1"}"#.to_string()))
                .await
                .expect("connect ack");
            ws.send(Message::Text("2".to_string())).await.expect("ping");
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                received.push(text);
            }
            for frame in [
                r#"42["free-space","10 GiB"]"#,
                r#"42["job-activity",true]"#,
                r#"42["free-space","9 GiB"]"#,
                "4garbage",
                r#"42["free-space","8 GiB"]"#,
            ] {
                ws.send(Message::Text(frame.to_string()))
                    .await
                    .expect("event");
            }
            while let Some(Ok(_)) = ws.next().await {}
            received
        });

        let mut gateway = Gateway::connect(Endpoint::new("127.0.0.1", port));
        assert_eq!(
            next_event(&mut gateway).await,
            GatewayEvent::Connected {
                sid: "sock-1".to_string()
            }
        );
        assert_eq!(next_event(&mut gateway).await, push("free-space", json!("10 GiB")));
        assert_eq!(next_event(&mut gateway).await, push("job-activity", json!(true)));
        assert_eq!(next_event(&mut gateway).await, push("free-space", json!("9 GiB")));
        assert_eq!(next_event(&mut gateway).await, push("free-space", json!("8 GiB")));

        gateway.shutdown();
        let received = timeout(WAIT, server)
            .await
            .expect("server finished after teardown")
            .expect("server task");
        assert_eq!(received, vec!["40".to_string(), "3".to_string()]);
    }

    #[tokio::test]
    async fn retarget_never_carries_stale_events() {
        let first = TcpListener::bind("127.0.0.1:0").await.expect("bind first");
        let first_port = first.local_addr().expect("addr").port();
        let second = TcpListener::bind("127.0.0.1:0").await.expect("bind second");
        let second_port = second.local_addr().expect("addr").port();
        let (late_tx, late_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let (stream, _) = first.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("ws handshake");
            let _ = ws.send(Message::Text(OPEN.to_string())).await;
            let _ = ws.next().await;
            let _ = ws
                .send(Message::Text(r#"40{"sid":"old"}"#.to_string()))
                .await;
            let _ = ws
                .send(Message::Text(r#"42["free-space","old"]"#.to_string()))
                .await;
            let _ = late_rx.await;
            let _ = ws
                .send(Message::Text(r#"42["free-space","old-late"]"#.to_string()))
                .await;
        });
        tokio::spawn(async move {
            let (stream, _) = second.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("ws handshake");
            let _ = ws.send(Message::Text(OPEN.to_string())).await;
            let _ = ws.next().await;
            let _ = ws
                .send(Message::Text(r#"40{"sid":"new"}"#.to_string()))
                .await;
            let _ = ws
                .send(Message::Text(r#"42["free-space","new"]"#.to_string()))
                .await;
            while let Some(Ok(_)) = ws.next().await {}
        });

        let first_endpoint = Endpoint::new("127.0.0.1", first_port);
        let mut gateway = Gateway::connect(first_endpoint.clone());
        assert!(matches!(
            next_event(&mut gateway).await,
            GatewayEvent::Connected { .. }
        ));
        assert_eq!(next_event(&mut gateway).await, push("free-space", json!("old")));

        let gateway = gateway.retarget(first_endpoint.clone());
        assert_eq!(gateway.endpoint(), &first_endpoint);

        let second_endpoint = Endpoint::new("127.0.0.1", second_port);
        let mut gateway = gateway.retarget(second_endpoint.clone());
        let _ = late_tx.send(());
        assert_eq!(gateway.endpoint(), &second_endpoint);
        assert_eq!(
            next_event(&mut gateway).await,
            GatewayEvent::Connected {
                sid: "new".to_string()
            }
        );
        assert_eq!(next_event(&mut gateway).await, push("free-space", json!("new")));
        assert!(timeout(Duration::from_millis(200), gateway.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_is_silent() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let mut gateway = Gateway::connect(Endpoint::new("127.0.0.1", port));
        assert!(timeout(Duration::from_millis(300), gateway.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stalled_upgrade_is_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
                let _ = accepted_tx.send(held.len());
            }
        });

        let timing = Timing {
            handshake: Duration::from_millis(150),
            initial_backoff: Duration::from_millis(50),
        };
        let _gateway = Gateway::spawn(Endpoint::new("127.0.0.1", port), timing);
        let mut accepts = 0;
        while accepts < 2 {
            accepts = timeout(WAIT, accepted_rx.recv())
                .await
                .expect("gateway reconnects after a stalled upgrade")
                .expect("listener alive");
        }
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        assert_eq!(next_backoff(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_backoff(Duration::from_secs(8)), MAX_BACKOFF);
        assert_eq!(next_backoff(MAX_BACKOFF), MAX_BACKOFF);
    }
}
