use pattern::{MAX_RESOLUTION, MIN_RESOLUTION};

/// Compute resolution used when the viewport has no usable size yet.
pub const FALLBACK_RESOLUTION: u32 = 400;

/// Largest output image edge, in pixels, that a frame may be rasterised to.
pub const MAX_VIEWPORT: u32 = 16_384;

/// Maps a viewport size to the compute grid resolution.
///
/// Each axis computes at half the display size, clamped into
/// `[MIN_RESOLUTION, MAX_RESOLUTION]`. A zero or negative dimension (for
/// example a window that has not been laid out) yields
/// `FALLBACK_RESOLUTION` on both axes.
pub fn resolve(width: i64, height: i64) -> (u32, u32) {
    if width <= 0 || height <= 0 {
        return (FALLBACK_RESOLUTION, FALLBACK_RESOLUTION);
    }
    (axis(width), axis(height))
}

fn axis(dim: i64) -> u32 {
    let half = dim / 2;
    half.clamp(i64::from(MIN_RESOLUTION), i64::from(MAX_RESOLUTION)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_then_clamps() {
        assert_eq!(resolve(1000, 800), (500, 400));
        assert_eq!(resolve(200, 3000), (300, 1200));
        assert_eq!(resolve(601, 2401), (300, 1200));
        assert_eq!(resolve(i64::MAX, 1), (1200, 300));
    }

    #[test]
    fn degenerate_viewport_uses_fallback() {
        assert_eq!(resolve(0, 900), (400, 400));
        assert_eq!(resolve(900, -1), (400, 400));
        assert_eq!(resolve(-5, -5), (400, 400));
    }
}
