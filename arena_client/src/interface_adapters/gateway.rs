// Connection gateway: decodes inbound frames, dispatches them to the match session,
// and encodes outbound client messages for the writer task.

use crate::domain::{Clock, ViewEvents, VisualEffects};
use crate::interface_adapters::net::{CloseReason, Inbound, Outbound, QueueError};
use crate::interface_adapters::protocol::{
    self, ClientMessage, DecodeError, EncodeError, MessageKind, PayloadError, ServerMessage,
};
use crate::use_cases::{BatchReport, MatchSession};

use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum SendError {
    Encode(EncodeError),
    // Writer queue is full; the message was dropped.
    Full,
    Closed,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Encode(e) => write!(f, "{e}"),
            SendError::Full => f.write_str("outbound queue full"),
            SendError::Closed => f.write_str("connection closed"),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Encode(e) => Some(e),
            SendError::Full | SendError::Closed => None,
        }
    }
}

/// Why a frame was dropped. Already logged and counted when returned.
#[derive(Debug)]
pub enum FrameError {
    Decode(DecodeError),
    Payload(PayloadError),
    Closed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Decode(e) => write!(f, "{e}"),
            FrameError::Payload(e) => write!(f, "{e}"),
            FrameError::Closed => f.write_str("frame arrived after close"),
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStats {
    pub frames_in: u64,
    pub bytes_in: u64,
    pub frames_out: u64,
    pub bytes_out: u64,
    pub decode_errors: u64,
    pub payload_errors: u64,
    pub unhandled: u64,
    pub ignored_after_close: u64,
}

pub struct Gateway<V, E, C> {
    session: MatchSession<V, E, C>,
    outbound: Outbound,
    stats: GatewayStats,
    closed: bool,

    last_decode_log: Instant,
    last_payload_log: Instant,
    last_outbound_full_log: Instant,
}

impl<V, E, C> Gateway<V, E, C>
where
    V: VisualEffects,
    E: ViewEvents,
    C: Clock,
{
    pub fn new(session: MatchSession<V, E, C>, outbound: Outbound) -> Self {
        // Let the first warning of each kind through immediately.
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            session,
            outbound,
            stats: GatewayStats::default(),
            closed: false,
            last_decode_log: now,
            last_payload_log: now,
            last_outbound_full_log: now,
        }
    }

    pub fn session(&self) -> &MatchSession<V, E, C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MatchSession<V, E, C> {
        &mut self.session
    }

    pub fn into_session(self) -> MatchSession<V, E, C> {
        self.session
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Encodes and queues one message; returns the frame size in bytes.
    pub fn send(&mut self, message: ClientMessage) -> Result<usize, SendError> {
        if self.closed {
            return Err(SendError::Closed);
        }

        let kind = message.kind();
        let text = message
            .into_envelope()
            .and_then(|envelope| protocol::encode(&envelope))
            .map_err(SendError::Encode)?;
        let bytes = text.len();

        match self.outbound.send_text(text) {
            Ok(()) => {
                self.stats.frames_out += 1;
                self.stats.bytes_out += bytes as u64;
                debug!(%kind, bytes, "queued outbound message");
                Ok(bytes)
            }
            Err(QueueError::Full) => {
                if should_log(&mut self.last_outbound_full_log) {
                    warn!(%kind, "outbound queue full; dropping message");
                }
                Err(SendError::Full)
            }
            Err(QueueError::Closed) => Err(SendError::Closed),
        }
    }

    /// Decodes one frame and runs exactly one session handler for it.
    pub fn handle_frame(&mut self, text: &str) -> Result<MessageKind, FrameError> {
        if self.closed {
            self.stats.ignored_after_close += 1;
            return Err(FrameError::Closed);
        }

        self.stats.frames_in += 1;
        self.stats.bytes_in += text.len() as u64;

        let envelope = match protocol::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.decode_errors += 1;
                if should_log(&mut self.last_decode_log) {
                    warn!(
                        error = %e,
                        decode_errors = self.stats.decode_errors,
                        "failed to decode frame; dropping"
                    );
                }
                return Err(FrameError::Decode(e));
            }
        };

        let kind = envelope.kind;
        let message = match ServerMessage::try_from(envelope) {
            Ok(message) => message,
            Err(PayloadError::Unhandled(kind)) => {
                self.stats.unhandled += 1;
                warn!(%kind, "unhandled message type");
                return Err(FrameError::Payload(PayloadError::Unhandled(kind)));
            }
            Err(e) => {
                self.stats.payload_errors += 1;
                if should_log(&mut self.last_payload_log) {
                    warn!(
                        error = %e,
                        payload_errors = self.stats.payload_errors,
                        "invalid payload; dropping"
                    );
                }
                return Err(FrameError::Payload(e));
            }
        };

        self.dispatch(message);
        Ok(kind)
    }

    /// Terminal; the session sees the close once and later frames are ignored.
    pub fn handle_closed(&mut self, reason: &CloseReason) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.outbound.close();
        self.session.on_closed();

        let GatewayStats {
            frames_in,
            bytes_in,
            frames_out,
            bytes_out,
            decode_errors,
            payload_errors,
            unhandled,
            ..
        } = self.stats;
        debug!(
            frames_in,
            bytes_in,
            frames_out,
            bytes_out,
            decode_errors,
            payload_errors,
            unhandled,
            "connection stats"
        );
        info!(%reason, "server disconnected");
    }

    /// Returns false once the connection is closed.
    pub fn handle_inbound(&mut self, inbound: Inbound) -> bool {
        match inbound {
            Inbound::Frame(text) => {
                let _ = self.handle_frame(&text);
            }
            Inbound::Closed(reason) => self.handle_closed(&reason),
        }
        !self.closed
    }

    /// Drains the inbound queue one frame at a time until the connection closes.
    pub async fn run(mut self, mut inbound_rx: mpsc::Receiver<Inbound>) -> Self {
        while let Some(inbound) = inbound_rx.recv().await {
            if !self.handle_inbound(inbound) {
                return self;
            }
        }
        // Reader went away without reporting a close.
        self.handle_closed(&CloseReason::Eof);
        self
    }

    fn dispatch(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Debug(text) => self.session.on_debug(&text),
            ServerMessage::StartGame => self.session.on_start_game(),
            ServerMessage::StartSimulation => self.session.on_start_simulation(),
            ServerMessage::ServerError(text) => self.session.on_server_error(&text),
            ServerMessage::AgentStates(batch) => {
                let report = self.session.on_agent_states(batch);
                log_report(MessageKind::AgentStates, &report);
            }
            ServerMessage::ProjectileStates(batch) => {
                let report = self.session.on_projectile_states(batch);
                log_report(MessageKind::ProjectileStates, &report);
            }
            ServerMessage::Destroy(notice) => {
                let removed = self.session.on_destroy(notice);
                debug!(id = notice.id, kind = %notice.kind, removed, "destroy");
            }
            ServerMessage::Results(result) => {
                let _ = self.session.on_results(&result);
            }
        }
    }
}

fn log_report(kind: MessageKind, report: &BatchReport) {
    for skipped in &report.skipped {
        warn!(%kind, error = %skipped, "skipping malformed snapshot");
    }
    if let Some(err) = &report.aborted {
        warn!(%kind, error = %err, applied = report.applied, "batch aborted");
    }
    debug!(
        %kind,
        applied = report.applied,
        ignored = report.ignored,
        skipped = report.skipped.len(),
        "batch reconciled"
    );
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKey, FlashKind, Vec2};
    use crate::interface_adapters::effects::{Effect, EffectLog};
    use crate::interface_adapters::net::OutboundFrame;
    use crate::interface_adapters::protocol::PlayerCodePayload;
    use crate::use_cases::test_support::{ManualClock, RecordingView, ViewCall};
    use crate::use_cases::{MatchPhase, SessionSettings};
    use serde_json::{Value, json};

    type TestGateway = Gateway<EffectLog, RecordingView, ManualClock>;

    fn gateway() -> (TestGateway, RecordingView, mpsc::Receiver<OutboundFrame>) {
        let view = RecordingView::default();
        let session = MatchSession::new(
            SessionSettings::default(),
            ManualClock::new(),
            EffectLog::new(),
            view.clone(),
        );
        let (outbound, outbound_rx) = Outbound::channel(8);
        (Gateway::new(session, outbound), view, outbound_rx)
    }

    fn frame(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn when_agent_states_follow_simulation_start_then_agent_is_updated() {
        let (mut gateway, _view, _rx) = gateway();
        gateway
            .handle_frame(&frame(json!({"type": "start_simulation", "data": null})))
            .expect("start_simulation");
        gateway.session_mut().effects_mut().drain();

        let kind = gateway
            .handle_frame(&frame(json!({
                "type": "agent_states",
                "data": [{
                    "id": 0,
                    "position": {"x": 10.0, "y": 20.0},
                    "angle": 45.0,
                    "health": 90,
                    "shieldEnabled": true,
                    "velocity": {"x": 1.0, "y": 0.0}
                }]
            })))
            .expect("agent_states");

        assert_eq!(kind, MessageKind::AgentStates);
        let agent = gateway.session().registry().agent(0).expect("agent 0");
        assert_eq!(agent.position, Vec2::new(10.0, 20.0));
        assert_eq!(agent.orientation, 45.0);
        assert_eq!(agent.health, 90);
        assert!(agent.shield_active);
        let effects = gateway.session().effects();
        assert_eq!(
            effects.count(|e| *e
                == Effect::Flash {
                    key: EntityKey::agent(0),
                    kind: FlashKind::Damage,
                }),
            1
        );
        assert_eq!(gateway.stats().frames_in, 2);
    }

    #[test]
    fn when_frame_is_not_json_then_it_is_counted_and_dropped() {
        let (mut gateway, view, _rx) = gateway();

        let result = gateway.handle_frame("{not json");

        assert!(matches!(result, Err(FrameError::Decode(DecodeError::Malformed(_)))));
        assert_eq!(gateway.stats().decode_errors, 1);
        assert!(view.calls().is_empty());
    }

    #[test]
    fn when_kind_is_unknown_then_decode_reports_it() {
        let (mut gateway, _view, _rx) = gateway();

        let result = gateway.handle_frame(&frame(json!({"type": "teleport", "data": {}})));

        match result {
            Err(FrameError::Decode(DecodeError::UnknownKind(tag))) => assert_eq!(tag, "teleport"),
            other => panic!("expected unknown kind, got {other:?}"),
        }
        assert_eq!(gateway.stats().decode_errors, 1);
    }

    #[test]
    fn when_player_code_arrives_inbound_then_it_is_unhandled() {
        let (mut gateway, _view, _rx) = gateway();

        let result = gateway.handle_frame(&frame(json!({
            "type": "player_code",
            "data": {"code": "", "class_name": "Bot"}
        })));

        assert!(matches!(
            result,
            Err(FrameError::Payload(PayloadError::Unhandled(MessageKind::PlayerCode)))
        ));
        assert_eq!(gateway.stats().unhandled, 1);
        assert_eq!(gateway.stats().payload_errors, 0);
    }

    #[test]
    fn when_payload_shape_mismatches_then_nothing_is_dispatched() {
        let (mut gateway, _view, _rx) = gateway();

        let result = gateway.handle_frame(&frame(json!({"type": "agent_states", "data": {}})));

        assert!(matches!(
            result,
            Err(FrameError::Payload(PayloadError::Shape {
                expected: "array",
                actual: "object",
                ..
            }))
        ));
        assert_eq!(gateway.stats().payload_errors, 1);
        assert!(gateway.session().effects().is_empty());
    }

    #[test]
    fn when_server_error_arrives_then_view_is_notified() {
        let (mut gateway, view, _rx) = gateway();

        gateway
            .handle_frame(&frame(json!({"type": "python_error", "data": "NameError"})))
            .expect("python_error");

        assert_eq!(view.calls(), vec![ViewCall::ServerError("NameError".to_string())]);
    }

    #[test]
    fn when_closed_then_later_frames_are_ignored() {
        let (mut gateway, view, mut rx) = gateway();

        gateway.handle_closed(&CloseReason::Eof);
        gateway.handle_closed(&CloseReason::Eof);
        let result = gateway.handle_frame(&frame(json!({"type": "start_game", "data": null})));

        assert!(matches!(result, Err(FrameError::Closed)));
        assert_eq!(gateway.stats().ignored_after_close, 1);
        assert_eq!(gateway.stats().frames_in, 0);
        assert_eq!(gateway.session().phase(), MatchPhase::Closed);
        assert_eq!(view.calls(), vec![ViewCall::Closed]);
        assert!(matches!(rx.try_recv(), Ok(OutboundFrame::Close)));
    }

    #[test]
    fn when_player_code_is_sent_then_encoded_frame_is_queued() {
        let (mut gateway, _view, mut rx) = gateway();

        let bytes = gateway
            .send(ClientMessage::PlayerCode(PlayerCodePayload {
                code: "class Bot: pass".to_string(),
                class_name: "Bot".to_string(),
            }))
            .expect("send");

        let Ok(OutboundFrame::Text(text)) = rx.try_recv() else {
            panic!("expected a queued text frame");
        };
        assert_eq!(text.len(), bytes);
        let value: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["type"], "player_code");
        assert_eq!(value["data"]["class_name"], "Bot");
        assert_eq!(gateway.stats().frames_out, 1);
    }

    #[test]
    fn when_sending_after_close_then_send_fails() {
        let (mut gateway, _view, _rx) = gateway();
        gateway.handle_closed(&CloseReason::Eof);

        let result = gateway.send(ClientMessage::Debug("hi".to_string()));

        assert!(matches!(result, Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn when_queue_ends_with_close_then_run_returns_final_state() {
        let (gateway, view, _rx) = gateway();
        let (tx, rx) = mpsc::channel(8);
        for value in [
            json!({"type": "start_game", "data": null}),
            json!({"type": "start_simulation", "data": null}),
            json!({"type": "destroy", "data": {"id": 1, "type": "agent"}}),
        ] {
            tx.send(Inbound::Frame(value.to_string())).await.expect("queue");
        }
        tx.send(Inbound::Closed(CloseReason::Eof)).await.expect("queue");
        tx.send(Inbound::Frame("ignored".to_string()))
            .await
            .expect("queue");

        let gateway = gateway.run(rx).await;

        assert!(gateway.is_closed());
        assert_eq!(gateway.stats().frames_in, 3);
        assert!(gateway.session().registry().agent(0).is_some());
        assert!(gateway.session().registry().agent(1).is_none());
        assert_eq!(
            view.calls(),
            vec![ViewCall::StartGame, ViewCall::StartSimulation, ViewCall::Closed]
        );
    }
}
