//! The adaptive transmission pipeline: one attempt per render tick, sends
//! gated by the rate limiter and then the change detector.
//!
//! Camera and screen capture run as two independent pipeline instances over
//! their own sources; both get the identical rate-limit/change-detect
//! discipline.

use crate::detector::{ChangeDetector, PixelBuffer};
use crate::encoder::{FrameEncoder, JpegFrameEncoder};
use crate::limiter::RateLimiter;
use crate::message::{ClientMessage, MediaKind};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::warn;

/// Opaque source of pixel snapshots; the camera/screen capture boundary.
pub trait CaptureSource {
    /// Latest frame, or `None` when nothing is ready yet.
    fn capture(&mut self) -> Option<PixelBuffer>;
}

/// What one tick attempt did. The two suppression causes are distinct on
/// purpose: `RateLimited` means "too soon", `Unchanged` means "not worth
/// sending".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Minimum inter-send interval has not elapsed yet.
    RateLimited,
    /// Capture source had no frame ready.
    NotReady,
    /// Frame was not different enough from the previously sent one.
    Unchanged,
    /// Frame was encoded and should be sent now.
    Sent(Vec<u8>),
    /// Encode step failed; nothing sent, baseline untouched.
    EncodeFailed,
}

/// Rolling transmit-rate statistic: frames actually sent per elapsed
/// second of the last window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmitRate {
    pub fps: f64,
}

impl fmt::Display for TransmitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} fps", self.fps)
    }
}

pub struct TransmissionPipeline<C, E = JpegFrameEncoder> {
    kind: MediaKind,
    source: C,
    encoder: E,
    detector: ChangeDetector,
    limiter: RateLimiter,
    /// Baseline for change detection: the previously *sent* frame, not the
    /// previous tick's.
    last_sent: Option<PixelBuffer>,
    frames_sent: u32,
    window_started: Option<Instant>,
}

impl<C: CaptureSource> TransmissionPipeline<C> {
    /// Pipeline with the stock tuning: 15 fps cap, dissimilarity threshold
    /// 5000, JPEG quality 70.
    pub fn with_defaults(kind: MediaKind, source: C) -> Self {
        Self::new(
            kind,
            source,
            JpegFrameEncoder::default(),
            ChangeDetector::default(),
            RateLimiter::default(),
        )
    }
}

impl<C: CaptureSource, E: FrameEncoder> TransmissionPipeline<C, E> {
    pub fn new(
        kind: MediaKind,
        source: C,
        encoder: E,
        detector: ChangeDetector,
        limiter: RateLimiter,
    ) -> Self {
        TransmissionPipeline {
            kind,
            source,
            encoder,
            detector,
            limiter,
            last_sent: None,
            frames_sent: 0,
            window_started: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Mutable access to the capture boundary, e.g. to release a device.
    pub fn source_mut(&mut self) -> &mut C {
        &mut self.source
    }

    /// One send attempt, driven by the render loop.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.limiter.ready(now) {
            return TickOutcome::RateLimited;
        }
        let Some(frame) = self.source.capture() else {
            return TickOutcome::NotReady;
        };
        if !self.detector.should_send(self.last_sent.as_ref(), &frame) {
            return TickOutcome::Unchanged;
        }

        match self.encoder.encode(&frame) {
            Ok(payload) => {
                self.limiter.mark_sent(now);
                self.last_sent = Some(frame);
                self.frames_sent += 1;
                TickOutcome::Sent(payload)
            }
            Err(e) => {
                warn!(kind = ?self.kind, "frame encode failed: {e}");
                TickOutcome::EncodeFailed
            }
        }
    }

    /// Wraps an encoded payload from [`TransmissionPipeline::tick`] into
    /// the wire message for this pipeline's media kind.
    pub fn frame_message(&self, payload: Vec<u8>) -> ClientMessage {
        ClientMessage::Frame {
            kind: self.kind,
            payload,
        }
    }

    /// Capture toggled off: the loop stops ticking, and whatever baseline
    /// and cadence state we had is meaningless after the gap.
    pub fn stop(&mut self) {
        self.last_sent = None;
        self.limiter.reset();
        self.frames_sent = 0;
        self.window_started = None;
    }

    /// Capture toggled back on: re-armed so the next frame sends
    /// unconditionally, with a fresh stats window.
    pub fn resume(&mut self, now: Instant) {
        self.stop();
        self.window_started = Some(now);
    }

    /// Surfaces the transmit rate once the current one-second window has
    /// elapsed, resetting the counter. Returns `None` mid-window.
    pub fn take_stats(&mut self, now: Instant) -> Option<TransmitRate> {
        let started = *self.window_started.get_or_insert(now);
        let elapsed = now.duration_since(started);
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        let fps = f64::from(self.frames_sent) / elapsed.as_secs_f64();
        self.frames_sent = 0;
        self.window_started = Some(now);
        Some(TransmitRate { fps })
    }
}
