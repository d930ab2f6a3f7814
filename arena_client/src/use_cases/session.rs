// Match session: per-message-kind workflows over one connection.

use super::reconciler::{BatchReport, Reconciler, ReconcilerSettings};
use super::registry::EntityRegistry;
use super::results::ResultPresenter;
use crate::domain::{
    Agent, AgentSnapshot, Clock, DestroyNotice, EntityId, MatchResult, ProjectileSnapshot,
    ResultSummary, SnapshotError, Vec2, ViewEvents, VisualEffects,
};
use tracing::{debug, info, warn};

// Arena placement for the two side agents at simulation start.
const SIDE_SPAWNS: [(EntityId, Vec2, f64); 2] = [
    (0, Vec2::new(130.0, 350.0), 0.0),
    (1, Vec2::new(894.0, 350.0), 180.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    // Connected, waiting for matchmaking.
    Lobby,
    // Matched; players are submitting code.
    InGame,
    Simulating,
    Finished,
    // Transport is gone; terminal.
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub reconciler: ReconcilerSettings,
    /// Health the side agents start with before their first snapshot.
    pub initial_agent_health: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerSettings::default(),
            initial_agent_health: 100,
        }
    }
}

/// Owns all synchronization state for one connection.
pub struct MatchSession<V, E, C> {
    reconciler: Reconciler<C>,
    presenter: ResultPresenter,
    effects: V,
    view: E,
    phase: MatchPhase,
    initial_agent_health: u32,
}

impl<V, E, C> MatchSession<V, E, C>
where
    V: VisualEffects,
    E: ViewEvents,
    C: Clock,
{
    pub fn new(settings: SessionSettings, clock: C, effects: V, view: E) -> Self {
        Self {
            reconciler: Reconciler::new(settings.reconciler, clock),
            presenter: ResultPresenter::new(),
            effects,
            view,
            phase: MatchPhase::Lobby,
            initial_agent_health: settings.initial_agent_health,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn registry(&self) -> &EntityRegistry {
        self.reconciler.registry()
    }

    pub fn effects(&self) -> &V {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut V {
        &mut self.effects
    }

    pub fn view(&self) -> &E {
        &self.view
    }

    pub fn on_debug(&mut self, message: &str) {
        debug!(message, "server debug message");
    }

    pub fn on_start_game(&mut self) {
        info!("match found; game starting");
        self.presenter = ResultPresenter::new();
        self.phase = MatchPhase::InGame;
        self.view.on_start_game();
    }

    /// Starts a fresh registry and places both side agents.
    pub fn on_start_simulation(&mut self) {
        info!("simulation starting");
        self.reconciler.reset(&mut self.effects);

        for (id, position, orientation) in SIDE_SPAWNS {
            let agent = Agent::new(id, position, orientation, self.initial_agent_health);
            if let Err(err) = self.reconciler.spawn_agent(agent, &mut self.effects) {
                warn!(error = %err, "failed to spawn side agent");
            }
        }

        self.phase = MatchPhase::Simulating;
        self.view.on_start_simulation();
    }

    pub fn on_server_error(&mut self, message: &str) {
        warn!(message, "server reported player code error");
        self.view.on_server_error(message);
    }

    pub fn on_agent_states<I>(&mut self, batch: I) -> BatchReport
    where
        I: IntoIterator<Item = Result<AgentSnapshot, SnapshotError>>,
    {
        self.reconciler.reconcile_agents(batch, &mut self.effects)
    }

    pub fn on_projectile_states<I>(&mut self, batch: I) -> BatchReport
    where
        I: IntoIterator<Item = Result<ProjectileSnapshot, SnapshotError>>,
    {
        self.reconciler.reconcile_projectiles(batch, &mut self.effects)
    }

    pub fn on_destroy(&mut self, notice: DestroyNotice) -> bool {
        self.reconciler.destroy(notice, &mut self.effects)
    }

    /// Presents the result once, then tears down the match registry.
    pub fn on_results(&mut self, result: &MatchResult) -> Option<ResultSummary> {
        let summary = self.presenter.present(result)?;
        info!(
            winner = result.winner_declared,
            tie = result.is_tie,
            error = result.terminated_by_error,
            "match over"
        );
        self.view.on_results(&summary);
        self.reconciler.reset(&mut self.effects);
        self.phase = MatchPhase::Finished;
        Some(summary)
    }

    pub fn on_closed(&mut self) {
        if self.phase == MatchPhase::Closed {
            return;
        }
        info!(phase = ?self.phase, "connection closed");
        self.phase = MatchPhase::Closed;
        self.view.on_closed();
    }
}
