use crate::domain::model::{BoundingBox, CoordinatePair};
use serde::{Deserialize, Serialize};

/// Parse the first two comma-separated numbers of a KML coordinate string.
///
/// Anything after the second value (altitude, further tuples) is ignored.
pub fn parse_pair(text: &str) -> Option<CoordinatePair> {
    let mut parts = text.trim().split(',');
    let first = parts.next()?.trim().parse::<f64>().ok()?;
    let second = parts.next()?.trim().parse::<f64>().ok()?;
    Some(CoordinatePair::new(first, second))
}

/// Thresholds for guessing that a pair was written as `lat,lon`.
///
/// This is a best-effort heuristic, not a validator: a pair is treated as
/// reversed when both values are nonzero and either the second value is
/// larger than any plausible latitude for the dataset (`lat_threshold`) or the
/// first value is smaller than any plausible longitude (`lon_threshold`).
/// Points where both readings are plausible can be misjudged either way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReorderPolicy {
    pub lat_threshold: f64,
    pub lon_threshold: f64,
}

impl Default for ReorderPolicy {
    fn default() -> Self {
        Self {
            lat_threshold: 65.0,
            lon_threshold: 50.0,
        }
    }
}

impl ReorderPolicy {
    pub fn looks_reversed(&self, pair: CoordinatePair) -> bool {
        let (a, b) = (pair.lon.abs(), pair.lat.abs());
        a > 0.0 && b > 0.0 && (b > self.lat_threshold || a < self.lon_threshold)
    }

    pub fn normalize(&self, pair: CoordinatePair) -> CoordinatePair {
        if self.looks_reversed(pair) {
            pair.swapped()
        } else {
            pair
        }
    }

    /// Recomputed `lon,lat,0` text, or `None` when `text` does not parse.
    pub fn reorder(&self, text: &str) -> Option<String> {
        parse_pair(text).map(|pair| self.normalize(pair).to_kml())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlipOutcome {
    pub text: String,
    pub flipped: bool,
}

/// Swap the pair when it falls inside any of `boxes`.
pub fn flip_in_boxes(pair: CoordinatePair, boxes: &[BoundingBox]) -> FlipOutcome {
    if boxes.iter().any(|bbox| bbox.contains(pair)) {
        FlipOutcome {
            text: pair.swapped().to_kml(),
            flipped: true,
        }
    } else {
        FlipOutcome {
            text: pair.to_kml(),
            flipped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair(" -122.3, 47.6 ,0 "), Some(CoordinatePair::new(-122.3, 47.6)));
        assert_eq!(parse_pair("10,70"), Some(CoordinatePair::new(10.0, 70.0)));
        assert_eq!(parse_pair("10"), None);
        assert_eq!(parse_pair("east,north,0"), None);
        assert_eq!(parse_pair(""), None);
    }

    #[test]
    fn test_reorder_boundary_cases() {
        let policy = ReorderPolicy::default();

        // |b| = 70 > 65
        assert_eq!(policy.reorder("10,70,0").as_deref(), Some("70,10,0"));
        // |b| = 40 不大於 65，|a| = 100 不小於 50
        assert_eq!(policy.reorder("-100,40,0").as_deref(), Some("-100,40,0"));
        // |a| = 47.6 < 50
        assert_eq!(policy.reorder("47.6,-122.3,0").as_deref(), Some("-122.3,47.6,0"));
    }

    #[test]
    fn test_reorder_keeps_pairs_with_a_zero() {
        let policy = ReorderPolicy::default();
        assert_eq!(policy.reorder("0,70,0").as_deref(), Some("0,70,0"));
        assert_eq!(policy.reorder("10,0,0").as_deref(), Some("10,0,0"));
    }

    #[test]
    fn test_reorder_drops_altitude() {
        let policy = ReorderPolicy::default();
        assert_eq!(policy.reorder("-100.5,40.25,312").as_deref(), Some("-100.5,40.25,0"));
        assert_eq!(policy.reorder("not,a,number"), None);
    }

    #[test]
    fn test_reorder_thresholds_are_configurable() {
        let strict = ReorderPolicy {
            lat_threshold: 90.0,
            lon_threshold: 10.0,
        };
        assert_eq!(ReorderPolicy::default().reorder("30,70,0").as_deref(), Some("70,30,0"));
        assert_eq!(strict.reorder("30,70,0").as_deref(), Some("30,70,0"));
        assert_eq!(strict.reorder("5,30,0").as_deref(), Some("30,5,0"));
    }

    #[test]
    fn test_flip_in_boxes() {
        let boxes = [BoundingBox::new(-15.0, 15.0, 30.0, 60.0)];

        let inside = flip_in_boxes(CoordinatePair::new(40.0, 0.0), &boxes);
        assert!(inside.flipped);
        assert_eq!(inside.text, "0,40,0");

        let outside = flip_in_boxes(CoordinatePair::new(40.0, 20.0), &boxes);
        assert!(!outside.flipped);
        assert_eq!(outside.text, "40,20,0");
    }

    #[test]
    fn test_flip_with_no_boxes_only_normalizes() {
        let outcome = flip_in_boxes(CoordinatePair::new(40.0, 0.0), &[]);
        assert!(!outcome.flipped);
        assert_eq!(outcome.text, "40,0,0");
    }
}
