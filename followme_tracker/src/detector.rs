//! Subject detection.
//!
//! The tracker consumes one [`SubjectObservation`] per frame at most; where
//! it comes from is behind the [`SubjectDetector`] trait. The bundled
//! [`BrightRegionDetector`] finds the bounding box of bright pixels, which is
//! what the simulation driver renders.

use crate::platform::Frame;
use followme_common::config::DetectorConfig;

/// Subject position and apparent size in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectObservation {
    /// Bounding-box center [px from the left edge].
    pub center_x: f64,
    /// Bounding-box center [px from the top edge].
    pub center_y: f64,
    /// Bounding-box area [px²]; a proxy for distance.
    pub area: f64,
}

impl SubjectObservation {
    pub const fn new(center_x: f64, center_y: f64, area: f64) -> Self {
        Self {
            center_x,
            center_y,
            area,
        }
    }
}

/// Locates the subject in a frame.
pub trait SubjectDetector: Send {
    /// `None` when no subject is visible.
    fn detect(&mut self, frame: &Frame) -> Option<SubjectObservation>;
}

/// Bounding box of all pixels at or above a luminance threshold.
#[derive(Debug, Clone)]
pub struct BrightRegionDetector {
    threshold: u8,
    min_area: u32,
}

impl BrightRegionDetector {
    pub const fn new(threshold: u8, min_area: u32) -> Self {
        Self {
            threshold,
            min_area,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.luminance_threshold, config.min_area)
    }
}

impl SubjectDetector for BrightRegionDetector {
    fn detect(&mut self, frame: &Frame) -> Option<SubjectObservation> {
        let width = frame.width as usize;
        if width == 0 {
            return None;
        }

        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (row, line) in frame.pixels.chunks_exact(width).enumerate() {
            let Some(first) = line.iter().position(|&p| p >= self.threshold) else {
                continue;
            };
            let last = line.iter().rposition(|&p| p >= self.threshold).unwrap_or(first);
            bounds = Some(match bounds {
                None => (first, row, last, row),
                Some((l, t, r, _)) => (l.min(first), t, r.max(last), row),
            });
        }

        let (left, top, right, bottom) = bounds?;
        let box_w = (right - left + 1) as f64;
        let box_h = (bottom - top + 1) as f64;
        let area = box_w * box_h;
        if area < f64::from(self.min_area) {
            return None;
        }

        Some(SubjectObservation::new(
            left as f64 + box_w / 2.0,
            top as f64 + box_h / 2.0,
            area,
        ))
    }
}
