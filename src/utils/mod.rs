
use crate::message::ConnectionId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out process-unique connection ids for accepted transports.
pub fn next_connection_id() -> ConnectionId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    ConnectionId(COUNTER.fetch_add(1, Ordering::Relaxed))
}
