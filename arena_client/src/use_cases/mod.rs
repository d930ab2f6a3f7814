// Use cases layer: synchronization workflows for the arena client.

pub mod reconciler;
pub mod registry;
pub mod results;
pub mod session;
#[cfg(test)]
pub(crate) mod test_support;

pub use reconciler::{BatchReport, Reconciler, ReconcilerSettings};
pub use registry::EntityRegistry;
pub use results::ResultPresenter;
pub use session::{MatchPhase, MatchSession, SessionSettings};
