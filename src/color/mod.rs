//! Duration → severity color mapping.
//!
//! Two policies are supported:
//! - [`FixedScale`]: piecewise-linear `[0, 2, threshold, 4, 10]` →
//!   `[green, green, yellow, red, red]`, clamped, interpolated in RGB.
//! - [`PercentileScale`]: `[p95, midpoint, p5]` → `[red, yellow, green]`,
//!   interpolated in CIELAB; items ranked below the normalized threshold
//!   are drawn in [`DISABLED`].
//!
//! Neither scale ever divides by a zero-width domain segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::PercentileBounds;

pub mod lab;

pub const MIN_DURATION: f64 = 0.0;
pub const MAX_DURATION: f64 = 10.0;
pub const DEFAULT_THRESHOLD: f64 = 3.0;

pub const GREEN: Rgb = Rgb::new(0, 128, 0);
pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
pub const RED: Rgb = Rgb::new(255, 0, 0);
pub const DISABLED: Rgb = Rgb::new(0xcc, 0xcc, 0xcc);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation in RGB space, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPolicy {
    #[default]
    Fixed,
    Percentile,
}

impl FromStr for ColorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ColorPolicy::Fixed),
            "percentile" => Ok(ColorPolicy::Percentile),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ColorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorPolicy::Fixed => f.write_str("fixed"),
            ColorPolicy::Percentile => f.write_str("percentile"),
        }
    }
}

/// Clamp a user threshold into the control's `0..=10` range.
pub fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() {
        threshold.clamp(MIN_DURATION, MAX_DURATION)
    } else {
        DEFAULT_THRESHOLD
    }
}

/// Piecewise-linear interpolation over a possibly non-monotonic domain.
fn piecewise<F>(domain: &[f64], range: &[Rgb], x: f64, interpolate: F) -> Rgb
where
    F: Fn(Rgb, Rgb, f64) -> Rgb,
{
    let last = domain.len() - 1;
    if x <= domain[0] {
        return range[0];
    }
    if x >= domain[last] {
        return range[last];
    }
    for i in 0..last {
        let (lo, hi) = (domain[i], domain[i + 1]);
        if hi > lo && x >= lo && x <= hi {
            return interpolate(range[i], range[i + 1], (x - lo) / (hi - lo));
        }
    }
    // Only reachable when segments overlap oddly; pick the last knot at or below x.
    domain
        .iter()
        .rposition(|&d| d <= x)
        .map(|i| range[i])
        .unwrap_or(range[0])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScale {
    threshold: f64,
}

impl FixedScale {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: clamp_threshold(threshold),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn color(&self, hours: f64) -> Rgb {
        let hours = if hours.is_finite() { hours } else { 0.0 };
        let domain = [MIN_DURATION, 2.0, self.threshold, 4.0, MAX_DURATION];
        let range = [GREEN, GREEN, YELLOW, RED, RED];
        piecewise(&domain, &range, hours, Rgb::lerp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileScale {
    bounds: PercentileBounds,
    /// Normalized visibility cutoff in `[0, 1]`.
    cutoff: f64,
}

impl PercentileScale {
    pub fn new(bounds: PercentileBounds, threshold: f64) -> Self {
        Self {
            bounds,
            cutoff: clamp_threshold(threshold) / MAX_DURATION,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Severity color ignoring the visibility cutoff.
    pub fn severity(&self, hours: f64) -> Rgb {
        if self.bounds.is_degenerate() {
            return YELLOW;
        }
        let hours = if hours.is_finite() { hours } else { 0.0 };
        // Reversed domain: longer durations are worse. Normalize to ascending.
        let (p5, p95) = (self.bounds.p5_hours, self.bounds.p95_hours);
        let (domain, range) = if p5 <= p95 {
            ([p5, self.bounds.midpoint(), p95], [GREEN, YELLOW, RED])
        } else {
            ([p95, self.bounds.midpoint(), p5], [RED, YELLOW, GREEN])
        };
        piecewise(&domain, &range, hours, lab::interpolate)
    }

    pub fn color(&self, hours: f64, percent_rank: f64) -> Rgb {
        if percent_rank < self.cutoff {
            DISABLED
        } else {
            self.severity(hours)
        }
    }
}

/// A configured mapping, re-applied on threshold changes without re-aggregating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorScale {
    Fixed(FixedScale),
    /// `None` bounds means nothing was ranked; everything maps to one color.
    Percentile(Option<PercentileScale>),
}

impl ColorScale {
    pub fn new(policy: ColorPolicy, threshold: f64, bounds: Option<PercentileBounds>) -> Self {
        match policy {
            ColorPolicy::Fixed => ColorScale::Fixed(FixedScale::new(threshold)),
            ColorPolicy::Percentile => {
                ColorScale::Percentile(bounds.map(|b| PercentileScale::new(b, threshold)))
            }
        }
    }

    pub fn color(&self, hours: f64, percent_rank: f64) -> Rgb {
        match self {
            ColorScale::Fixed(scale) => scale.color(hours),
            ColorScale::Percentile(Some(scale)) => scale.color(hours, percent_rank),
            ColorScale::Percentile(None) => YELLOW,
        }
    }

    /// Whether the item is shown in its severity color rather than muted.
    pub fn is_visible(&self, percent_rank: f64) -> bool {
        match self {
            ColorScale::Percentile(Some(scale)) => percent_rank >= scale.cutoff(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_scale_knots() {
        let scale = FixedScale::new(3.0);
        assert_eq!(scale.color(0.0), GREEN);
        assert_eq!(scale.color(2.0), GREEN);
        assert_eq!(scale.color(3.0), YELLOW);
        assert_eq!(scale.color(4.0), RED);
        assert_eq!(scale.color(10.0), RED);
    }

    #[test]
    fn test_fixed_scale_clamps() {
        let scale = FixedScale::new(3.0);
        assert_eq!(scale.color(-5.0), GREEN);
        assert_eq!(scale.color(250.0), RED);
        assert_eq!(scale.color(f64::NAN), GREEN);
    }

    #[test]
    fn test_fixed_scale_interpolates() {
        let scale = FixedScale::new(3.0);
        let mid = scale.color(2.5);
        assert_eq!(mid, GREEN.lerp(YELLOW, 0.5));
        assert_ne!(mid, GREEN);
        assert_ne!(mid, YELLOW);
    }

    #[test]
    fn test_fixed_scale_degenerate_threshold() {
        // Threshold on a knot: zero-width segment must not divide by zero.
        let scale = FixedScale::new(2.0);
        assert_eq!(scale.color(2.0), GREEN);
        let c = scale.color(3.0);
        assert_eq!(c, YELLOW.lerp(RED, 0.5));
        let low = FixedScale::new(1.0);
        let _ = low.color(1.5);
        let _ = low.color(3.0);
    }

    #[test]
    fn test_threshold_is_clamped() {
        assert_eq!(FixedScale::new(42.0).threshold(), 10.0);
        assert_eq!(FixedScale::new(-1.0).threshold(), 0.0);
        assert_eq!(FixedScale::new(f64::INFINITY).threshold(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_color_mapping_idempotent() {
        let scale = ColorScale::new(ColorPolicy::Fixed, 3.3, None);
        for h in [0.0, 1.7, 3.3, 3.9, 12.0] {
            assert_eq!(scale.color(h, 0.5), scale.color(h, 0.5));
        }
    }

    #[test]
    fn test_percentile_scale_is_inverted() {
        let bounds = PercentileBounds {
            p5_hours: 1.0,
            p95_hours: 9.0,
        };
        let scale = PercentileScale::new(bounds, 0.0);
        assert_eq!(scale.severity(9.0), RED);
        assert_eq!(scale.severity(20.0), RED);
        assert_eq!(scale.severity(1.0), GREEN);
        assert_eq!(scale.severity(0.0), GREEN);
        assert_eq!(scale.severity(5.0), YELLOW);
    }

    #[test]
    fn test_percentile_cutoff_disables() {
        let bounds = PercentileBounds {
            p5_hours: 1.0,
            p95_hours: 9.0,
        };
        let scale = PercentileScale::new(bounds, 3.0);
        assert_eq!(scale.color(9.0, 0.2), DISABLED);
        assert_eq!(scale.color(9.0, 0.3), RED);
    }

    #[test]
    fn test_percentile_degenerate_collapses() {
        let bounds = PercentileBounds {
            p5_hours: 4.0,
            p95_hours: 4.0,
        };
        let scale = PercentileScale::new(bounds, 0.0);
        assert_eq!(scale.severity(0.0), scale.severity(100.0));
        let empty = ColorScale::new(ColorPolicy::Percentile, 3.0, None);
        assert_eq!(empty.color(1.0, 1.0), YELLOW);
    }

    #[test]
    fn test_policy_parse_and_hex() {
        assert_eq!("Percentile".parse::<ColorPolicy>().unwrap(), ColorPolicy::Percentile);
        assert!("rainbow".parse::<ColorPolicy>().is_err());
        assert_eq!(GREEN.to_hex(), "#008000");
        assert_eq!(DISABLED.to_string(), "#cccccc");
    }
}
