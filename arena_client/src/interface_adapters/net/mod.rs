// WebSocket transport: a reader task feeding a single-consumer queue and a writer task.

pub mod client;

pub use client::{
    CloseReason, ConnectError, Connection, Inbound, Outbound, OutboundFrame, QueueError,
    TransportSettings, connect,
};
