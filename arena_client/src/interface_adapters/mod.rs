// Interface adapters: wire protocol, transport, gateway dispatch and output adapters.

pub mod effects;
pub mod gateway;
pub mod net;
pub mod protocol;
pub mod state;
pub mod view;

pub use effects::{Effect, EffectLog, TracingRenderer};
pub use gateway::{FrameError, Gateway, GatewayStats, SendError};
pub use state::SystemClock;
pub use view::{ConsoleView, Screen};
