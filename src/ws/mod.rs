//! WebSocket transport: upgrade handling and the binary wire protocol

pub mod handler;
pub mod protocol;
