// Framework bootstrap for the arena client runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{self, CloseReason, Inbound, TransportSettings};
use crate::interface_adapters::protocol::{ClientMessage, PlayerCodePayload};
use crate::interface_adapters::{ConsoleView, Gateway, SendError, SystemClock, TracingRenderer};
use crate::use_cases::{MatchPhase, MatchSession, ReconcilerSettings, SessionSettings};

use std::io::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, info_span, warn};

type ClientGateway = Gateway<TracingRenderer, ConsoleView, SystemClock>;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub transport: TransportSettings,
    pub session: SessionSettings,
    pub flash_duration: Duration,
    pub render_interval: Duration,
    /// Submitted once the server announces the game.
    pub player_code: Option<PlayerCodePayload>,
}

impl ClientSettings {
    pub fn from_env() -> Self {
        Self {
            transport: TransportSettings {
                connect_timeout: config::connect_timeout(),
                inbound_capacity: config::INBOUND_CHANNEL_CAPACITY,
                outbound_capacity: config::OUTBOUND_CHANNEL_CAPACITY,
            },
            session: SessionSettings {
                reconciler: ReconcilerSettings {
                    flash_coalesce_window: config::flash_coalesce_window(),
                },
                initial_agent_health: config::INITIAL_AGENT_HEALTH,
            },
            flash_duration: config::flash_duration(),
            render_interval: config::RENDER_INTERVAL,
            player_code: None,
        }
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Connects to `url` and runs one session until the server closes the connection.
pub async fn run(url: &str, settings: ClientSettings) -> Result<()> {
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let span = info_span!("conn", conn_id, url);

    async move {
        let connection = net::connect(url, settings.transport)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to connect"))
            .map_err(Error::other)?;

        let session = MatchSession::new(
            settings.session,
            SystemClock,
            TracingRenderer::new(settings.flash_duration),
            ConsoleView::stdout(),
        );
        let gateway = Gateway::new(session, connection.outbound);

        let gateway = drive(
            gateway,
            connection.inbound_rx,
            settings.player_code,
            settings.render_interval,
        )
        .await;

        let session = gateway.session();
        info!(
            phase = ?session.phase(),
            effects = session.effects().applied(),
            "session finished"
        );
        Ok(())
    }
    .instrument(span)
    .await
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let url = config::server_url();
    let mut settings = ClientSettings::from_env();
    settings.player_code = load_player_code().await?;

    run(&url, settings).await
}

// Reads the player's code file when both the path and the class name are configured.
async fn load_player_code() -> Result<Option<PlayerCodePayload>> {
    let (Some(path), Some(class_name)) = (config::player_code_path(), config::player_class_name())
    else {
        debug!("no player code configured; spectating");
        return Ok(None);
    };

    let code = tokio::fs::read_to_string(&path).await.inspect_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to read player code");
    })?;
    info!(path = %path.display(), class_name, bytes = code.len(), "loaded player code");
    Ok(Some(PlayerCodePayload { code, class_name }))
}

// Single consumer: inbound frames and render ticks are handled one at a time.
async fn drive(
    mut gateway: ClientGateway,
    mut inbound_rx: mpsc::Receiver<Inbound>,
    mut player_code: Option<PlayerCodePayload>,
    render_interval: Duration,
) -> ClientGateway {
    let mut render = tokio::time::interval(render_interval);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            inbound = inbound_rx.recv() => {
                let Some(inbound) = inbound else {
                    gateway.handle_closed(&CloseReason::Eof);
                    break;
                };
                if !gateway.handle_inbound(inbound) {
                    break;
                }
                if gateway.session().phase() == MatchPhase::InGame {
                    submit_player_code(&mut gateway, &mut player_code);
                }
            }
            _ = render.tick() => {
                gateway.session_mut().effects_mut().render_tick(Instant::now());
                if gateway.session().phase() == MatchPhase::InGame {
                    submit_player_code(&mut gateway, &mut player_code);
                }
            }
        }
    }

    gateway
}

// The payload stays pending while the writer queue is full and is retried on the next event.
fn submit_player_code(gateway: &mut ClientGateway, player_code: &mut Option<PlayerCodePayload>) {
    let Some(payload) = player_code.as_ref() else {
        return;
    };
    let class_name = payload.class_name.clone();
    match gateway.send(ClientMessage::PlayerCode(payload.clone())) {
        Ok(bytes) => {
            *player_code = None;
            info!(class_name, bytes, "submitted player code");
        }
        Err(SendError::Full) => {
            debug!(class_name, "outbound queue full; player code submission pending");
        }
        Err(e) => {
            *player_code = None;
            warn!(class_name, error = %e, "failed to submit player code");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::net::{Outbound, OutboundFrame};
    use serde_json::Value;

    fn payload() -> PlayerCodePayload {
        PlayerCodePayload {
            code: "class Bot: pass".to_string(),
            class_name: "Bot".to_string(),
        }
    }

    #[test]
    fn when_writer_queue_is_full_then_player_code_stays_pending_until_sent() {
        let (outbound, mut outbound_rx) = Outbound::channel(1);
        outbound
            .send_text("occupied".to_string())
            .expect("fill the queue");
        let session = MatchSession::new(
            SessionSettings::default(),
            SystemClock,
            TracingRenderer::new(Duration::from_millis(200)),
            ConsoleView::stdout(),
        );
        let mut gateway = Gateway::new(session, outbound);
        let mut player_code = Some(payload());

        submit_player_code(&mut gateway, &mut player_code);

        assert_eq!(player_code, Some(payload()));
        assert!(matches!(
            outbound_rx.try_recv(),
            Ok(OutboundFrame::Text(text)) if text == "occupied"
        ));

        submit_player_code(&mut gateway, &mut player_code);

        assert_eq!(player_code, None);
        let Ok(OutboundFrame::Text(text)) = outbound_rx.try_recv() else {
            panic!("expected the player code frame");
        };
        let value: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["type"], "player_code");
        assert_eq!(value["data"]["class_name"], "Bot");
    }

    #[test]
    fn when_connection_is_closed_then_player_code_is_dropped() {
        let (outbound, outbound_rx) = Outbound::channel(1);
        drop(outbound_rx);
        let session = MatchSession::new(
            SessionSettings::default(),
            SystemClock,
            TracingRenderer::new(Duration::from_millis(200)),
            ConsoleView::stdout(),
        );
        let mut gateway = Gateway::new(session, outbound);
        let mut player_code = Some(payload());

        submit_player_code(&mut gateway, &mut player_code);

        assert_eq!(player_code, None);
    }
}
