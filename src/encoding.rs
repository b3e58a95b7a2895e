//! Magnitude → circle style mapping shared by the markers and the legend.

use serde::Serialize;
use thiserror::Error;

use crate::constants::{CIRCLE_RADIUS_SCALE, MIN_CIRCLE_RADIUS};

/// One color bucket: every magnitude `>= lower_bound` (and below the next
/// bucket's bound) is drawn with `color`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MagnitudeBucket {
    pub lower_bound: f64,
    pub color: &'static str,
}

/// Ascending by lower bound. The encoder scans it from the top and the legend
/// renders it as-is, so both always agree.
pub static MAGNITUDE_BUCKETS: [MagnitudeBucket; 6] = [
    MagnitudeBucket { lower_bound: 0.0, color: "#98ee00" },
    MagnitudeBucket { lower_bound: 1.0, color: "#d4ee00" },
    MagnitudeBucket { lower_bound: 2.0, color: "#eecc00" },
    MagnitudeBucket { lower_bound: 3.0, color: "#ee9c00" },
    MagnitudeBucket { lower_bound: 4.0, color: "#ea822c" },
    MagnitudeBucket { lower_bound: 5.0, color: "#ea2c2c" },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualEncoding {
    /// Circle radius in meters.
    pub radius: f64,
    pub color: &'static str,
}

#[derive(Debug, Error, PartialEq)]
pub enum EncodingError {
    #[error("invalid magnitude: {0}")]
    InvalidMagnitude(f64),
}

/// Index into [`MAGNITUDE_BUCKETS`] for `magnitude`.
///
/// Lower bounds are inclusive, so a magnitude sitting exactly on a threshold
/// lands in the higher bucket. Anything below the second bound (including
/// negatives and NaN) falls through to the lowest bucket.
pub fn bucket_index(magnitude: f64) -> usize {
    MAGNITUDE_BUCKETS
        .iter()
        .rposition(|bucket| magnitude >= bucket.lower_bound)
        .unwrap_or(0)
}

pub fn bucket_for(magnitude: f64) -> &'static MagnitudeBucket {
    &MAGNITUDE_BUCKETS[bucket_index(magnitude)]
}

pub fn color(magnitude: f64) -> &'static str {
    bucket_for(magnitude).color
}

/// Radius in meters, never below [`MIN_CIRCLE_RADIUS`] so zero and negative
/// magnitudes still draw.
pub fn radius(magnitude: f64) -> f64 {
    (magnitude * CIRCLE_RADIUS_SCALE).max(MIN_CIRCLE_RADIUS)
}

/// Fails for non-finite input, and for finite magnitudes so large the scaled
/// radius overflows to infinity.
pub fn encode(magnitude: f64) -> Result<VisualEncoding, EncodingError> {
    if !magnitude.is_finite() {
        return Err(EncodingError::InvalidMagnitude(magnitude));
    }

    let radius = radius(magnitude);
    if !radius.is_finite() {
        return Err(EncodingError::InvalidMagnitude(magnitude));
    }

    Ok(VisualEncoding {
        radius,
        color: color(magnitude),
    })
}

/// The exact table the encoder scans; the legend must render from this.
pub fn legend_entries() -> &'static [MagnitudeBucket] {
    &MAGNITUDE_BUCKETS
}

/// Text label for a legend row: `"2–3"` style ranges, `"5+"` for the top.
pub fn bucket_label(index: usize) -> String {
    let entries = legend_entries();
    let low = entries[index].lower_bound;
    match entries.get(index + 1) {
        Some(next) => format!("{}–{}", low, next.lower_bound),
        None => format!("{}+", low),
    }
}

/// Legend body in the markup the map's `info legend` control expects.
pub fn legend_html() -> String {
    let entries = legend_entries();
    let mut html = String::new();

    for (i, bucket) in entries.iter().enumerate() {
        html.push_str(&format!("<i style='background: {}'></i> {}", bucket.color, bucket.lower_bound));
        match entries.get(i + 1) {
            Some(next) => html.push_str(&format!("&ndash;{}<br>", next.lower_bound)),
            None => html.push('+'),
        }
    }

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGHEST: &str = "#ea2c2c";
    const SECOND: &str = "#ea822c";
    const FIFTH: &str = "#d4ee00";
    const LOWEST: &str = "#98ee00";

    #[test]
    fn thresholds_are_inclusive_on_the_lower_bound() {
        assert_eq!(color(5.0), HIGHEST);
        assert_eq!(color(4.999), SECOND);
        assert_eq!(color(4.0), SECOND);
        assert_eq!(color(3.0), "#ee9c00");
        assert_eq!(color(2.0), "#eecc00");
        assert_eq!(color(1.0), FIFTH);
        assert_eq!(color(0.999), LOWEST);
    }

    #[test]
    fn negative_and_zero_magnitudes_use_lowest_bucket() {
        assert_eq!(color(-3.0), LOWEST);
        assert_eq!(color(0.0), LOWEST);
        assert_eq!(color(-0.0), LOWEST);
        assert_eq!(bucket_index(-100.0), 0);
    }

    #[test]
    fn very_large_magnitudes_use_highest_bucket() {
        assert_eq!(color(9.5), HIGHEST);
        assert_eq!(bucket_index(1e9), MAGNITUDE_BUCKETS.len() - 1);
    }

    #[test]
    fn color_is_deterministic() {
        for i in -50..120 {
            let m = i as f64 * 0.1;
            assert_eq!(color(m), color(m));
            assert!(MAGNITUDE_BUCKETS.iter().any(|b| b.color == color(m)));
        }
    }

    #[test]
    fn radius_is_monotonic_and_positive() {
        let mut previous = radius(-10.0);
        assert!(previous > 0.0);
        for i in -100..=100 {
            let r = radius(i as f64 * 0.1);
            assert!(r > 0.0);
            assert!(previous <= r, "radius decreased at m={}", i as f64 * 0.1);
            previous = r;
        }
    }

    #[test]
    fn radius_scales_with_magnitude() {
        assert_eq!(radius(5.2), 5.2 * CIRCLE_RADIUS_SCALE);
        assert_eq!(radius(0.0), MIN_CIRCLE_RADIUS);
        assert_eq!(radius(-3.0), MIN_CIRCLE_RADIUS);
        assert!(radius(2.0) < radius(3.0));
    }

    #[test]
    fn encode_scenarios() {
        let strong = encode(5.2).unwrap();
        assert_eq!(strong.color, HIGHEST);
        assert_eq!(strong.radius, radius(5.2));

        assert_eq!(encode(1.0).unwrap().color, FIFTH);
        assert_eq!(encode(0.0).unwrap().color, LOWEST);
    }

    #[test]
    fn encode_rejects_non_finite_input() {
        assert!(matches!(encode(f64::NAN), Err(EncodingError::InvalidMagnitude(m)) if m.is_nan()));
        assert_eq!(encode(f64::INFINITY), Err(EncodingError::InvalidMagnitude(f64::INFINITY)));
        assert_eq!(
            encode(f64::NEG_INFINITY),
            Err(EncodingError::InvalidMagnitude(f64::NEG_INFINITY))
        );
    }

    #[test]
    fn encode_rejects_magnitudes_whose_radius_overflows() {
        assert_eq!(encode(1e305), Err(EncodingError::InvalidMagnitude(1e305)));
        assert_eq!(encode(f64::MAX), Err(EncodingError::InvalidMagnitude(f64::MAX)));

        let huge = encode(1e300).unwrap();
        assert!(huge.radius.is_finite());
        assert_eq!(huge.color, HIGHEST);
    }

    #[test]
    fn legend_uses_the_encoder_table() {
        assert!(std::ptr::eq(legend_entries(), &MAGNITUDE_BUCKETS[..]));
        let colors: Vec<&str> = legend_entries().iter().map(|b| b.color).collect();
        assert_eq!(
            colors,
            ["#98ee00", "#d4ee00", "#eecc00", "#ee9c00", "#ea822c", "#ea2c2c"]
        );
    }

    #[test]
    fn every_bucket_bound_maps_back_to_its_own_color() {
        for bucket in legend_entries() {
            assert_eq!(color(bucket.lower_bound), bucket.color);
        }
    }

    #[test]
    fn legend_html_lists_colors_in_table_order() {
        let html = legend_html();
        let mut cursor = 0;
        for bucket in legend_entries() {
            let pos = html[cursor..].find(bucket.color).expect("color missing from legend");
            cursor += pos + bucket.color.len();
        }
        assert!(html.starts_with("<i style='background: #98ee00'></i> 0&ndash;1<br>"));
        assert!(html.ends_with("<i style='background: #ea2c2c'></i> 5+"));
    }

    #[test]
    fn bucket_labels() {
        assert_eq!(bucket_label(0), "0–1");
        assert_eq!(bucket_label(4), "4–5");
        assert_eq!(bucket_label(5), "5+");
    }
}
