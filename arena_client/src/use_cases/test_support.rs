use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::domain::{AgentSnapshot, Clock, ProjectileSnapshot, ResultSummary, Vec2, ViewEvents};

// Shared manual time source for deterministic flash-window tests.
#[derive(Clone)]
pub(crate) struct ManualClock {
    start: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ViewCall {
    StartGame,
    StartSimulation,
    ServerError(String),
    Results(ResultSummary),
    Closed,
}

// View fake that records every notification it receives.
#[derive(Clone, Default)]
pub(crate) struct RecordingView {
    calls: Rc<RefCell<Vec<ViewCall>>>,
}

impl RecordingView {
    pub(crate) fn calls(&self) -> Vec<ViewCall> {
        self.calls.borrow().clone()
    }
}

impl ViewEvents for RecordingView {
    fn on_start_game(&mut self) {
        self.calls.borrow_mut().push(ViewCall::StartGame);
    }

    fn on_start_simulation(&mut self) {
        self.calls.borrow_mut().push(ViewCall::StartSimulation);
    }

    fn on_server_error(&mut self, message: &str) {
        self.calls
            .borrow_mut()
            .push(ViewCall::ServerError(message.to_string()));
    }

    fn on_results(&mut self, summary: &ResultSummary) {
        self.calls
            .borrow_mut()
            .push(ViewCall::Results(summary.clone()));
    }

    fn on_closed(&mut self) {
        self.calls.borrow_mut().push(ViewCall::Closed);
    }
}

pub(crate) fn agent_snapshot(id: u64, x: f64, y: f64, health: u32) -> AgentSnapshot {
    AgentSnapshot {
        id,
        name: None,
        position: Vec2::new(x, y),
        orientation: 0.0,
        health,
        shield_active: false,
    }
}

pub(crate) fn projectile_snapshot(id: u64, owner_id: u64, x: f64, y: f64) -> ProjectileSnapshot {
    ProjectileSnapshot {
        id,
        owner_id,
        position: Vec2::new(x, y),
        orientation: 0.0,
    }
}
