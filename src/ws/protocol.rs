//! Binary wire protocol shared with game clients
//!
//! Everything on the socket is a small binary frame led by an opcode
//! byte. Snapshots are produced by the world; the announce and roster
//! frames are produced here, in the transport layer.

use bytes::{BufMut, Bytes, BytesMut};

/// A player connected: `0x1 | uid`.
pub const OP_CONNECT: u8 = 0x1;

/// A player disconnected: `0x2 | uid`.
pub const OP_DISCONNECT: u8 = 0x2;

/// Shared by client control inputs and world snapshots; the direction
/// disambiguates.
pub const OP_STATE: u8 = 0x3;

/// Roster sent to a client on connect: `0x4 | count | count x uid`.
pub const OP_ROSTER: u8 = 0x4;

/// Announce a new player to everyone.
pub fn connect_announce(uid: u8) -> Bytes {
    Bytes::from(vec![OP_CONNECT, uid])
}

/// Announce a departure to everyone.
pub fn disconnect_announce(uid: u8) -> Bytes {
    Bytes::from(vec![OP_DISCONNECT, uid])
}

/// Build the roster frame for a freshly connected player, its own uid
/// first, then every other connected uid.
pub fn roster(own_uid: u8, others: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + 1 + others.len());
    buf.put_u8(OP_ROSTER);
    buf.put_u8(1 + others.len() as u8);
    buf.put_u8(own_uid);
    buf.put_slice(others);
    buf.freeze()
}
