//! Framerelay relays periodic still-image "frames" between members of a
//! shared room over persistent websocket connections.
//!
//! The server side is a relay: a [`registry::RoomRegistry`] maps transient
//! connections to rooms and durable user identities, and a [`relay::Relay`]
//! fans every inbound frame or signaling event out to the sender's peers,
//! stamped with the sender identity. Transports plug in through the
//! [`connection::SinkAdapter`] / [`connection::StreamAdapter`] seam; raw
//! tokio-tungstenite and axum mounts are provided.
//!
//! The client side is the adaptive transmission pipeline: a
//! [`detector::ChangeDetector`] decides whether a captured frame is
//! different enough to bother sending, a [`limiter::RateLimiter`] caps the
//! outbound cadence independent of the capture cadence, and
//! [`pipeline::TransmissionPipeline`] composes the two with a JPEG encode
//! step. [`session::ClientSession`] keeps the rendered tile set, keyed by
//! durable user id, consistent with membership notifications.

pub mod connection;
pub mod detector;
pub mod encoder;
pub mod identity;
pub mod limiter;
pub mod message;
pub mod pipeline;
pub mod registry;
pub mod relay;
pub mod session;
pub mod utils;
