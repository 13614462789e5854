//! Coordinate mappings owned by each view. Scales are plain values rebuilt
//! from the view state on every redraw.

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    /// Builds an ordered, finite, non-empty interval.
    pub fn new(a: f64, b: f64) -> Result<Self> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if !lo.is_finite() || !hi.is_finite() || hi - lo <= 0.0 {
            return Err(DashboardError::DegenerateZoom { lo: a, hi: b });
        }
        Ok(Self { lo, hi })
    }

    /// Widens a zero-width extent so it can still be mapped.
    pub fn from_extent((lo, hi): (f64, f64)) -> Self {
        if hi > lo {
            Self { lo, hi }
        } else {
            Self {
                lo: lo - 0.5,
                hi: hi + 0.5,
            }
        }
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Intersection with `bounds`; fails when nothing of width remains.
    pub fn clip_to(&self, bounds: &Interval) -> Result<Self> {
        let lo = self.lo.max(bounds.lo);
        let hi = self.hi.min(bounds.hi);
        // Disjoint inputs leave lo > hi; that must not be reordered.
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(DashboardError::DegenerateZoom { lo, hi });
        }
        Ok(Self { lo, hi })
    }
}

/// Continuous `domain -> range` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    pub domain: Interval,
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: Interval, range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let t = (value - self.domain.lo) / self.domain.width();
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let span = self.range.1 - self.range.0;
        if span == 0.0 {
            return self.domain.lo;
        }
        let t = (pixel - self.range.0) / span;
        self.domain.lo + t * self.domain.width()
    }
}

/// Evenly spaced bands for categorical axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandScale {
    pub categories: Vec<String>,
    pub range: (f64, f64),
    pub padding: f64,
}

impl BandScale {
    pub fn new(categories: Vec<String>, range: (f64, f64), padding: f64) -> Self {
        Self {
            categories,
            range,
            padding: padding.clamp(0.0, 1.0),
        }
    }

    fn step(&self) -> f64 {
        let n = self.categories.len() as f64;
        (self.range.1 - self.range.0) / (n - self.padding + 2.0 * self.padding).max(1.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding)
    }

    /// Left edge of the band for `category`.
    pub fn position(&self, category: &str) -> Option<f64> {
        let idx = self.categories.iter().position(|c| c == category)?;
        let step = self.step();
        Some(self.range.0 + step * self.padding + step * idx as f64)
    }
}
