//! Pixel-buffer dissimilarity: decides whether a captured frame is
//! different enough from the last *sent* one to justify sending.

/// Fixed-layout RGBA snapshot handed over by a capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// RGBA bytes, 4 per pixel, row-major.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        PixelBuffer { width, height, data }
    }

    /// Solid-color buffer, handy for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        PixelBuffer { width, height, data }
    }
}

/// Dissimilarity threshold the original tuning settled on.
pub const DEFAULT_THRESHOLD: u64 = 5000;

/// Sum of absolute red/green/blue differences, one sample per pixel at
/// 4-byte stride; alpha is ignored. A shape mismatch (different dimensions
/// or byte length) is maximal dissimilarity: such buffers are never "the
/// same frame".
pub fn dissimilarity(previous: &PixelBuffer, current: &PixelBuffer) -> u64 {
    if previous.width != current.width
        || previous.height != current.height
        || previous.data.len() != current.data.len()
    {
        return u64::MAX;
    }

    let mut diff = 0u64;
    for (p, c) in previous
        .data
        .chunks_exact(4)
        .zip(current.data.chunks_exact(4))
    {
        diff += u64::from(p[0].abs_diff(c[0]))
            + u64::from(p[1].abs_diff(c[1]))
            + u64::from(p[2].abs_diff(c[2]));
    }
    diff
}

/// Send/suppress decision over [`dissimilarity`].
#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    threshold: u64,
}

impl ChangeDetector {
    pub fn new(threshold: u64) -> Self {
        ChangeDetector { threshold }
    }

    /// True when there is no baseline yet, or the current frame differs
    /// from it by strictly more than the threshold.
    pub fn should_send(&self, previous: Option<&PixelBuffer>, current: &PixelBuffer) -> bool {
        match previous {
            None => true,
            Some(previous) => dissimilarity(previous, current) > self.threshold,
        }
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        ChangeDetector::new(DEFAULT_THRESHOLD)
    }
}
