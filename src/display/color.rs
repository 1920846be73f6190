//! Marker coloring by metric percentage.
//!
//! Percentages are bucketed into ten-point bins on an eleven-step scale
//! running from green (healthy) to red.

use crate::model::{ChannelId, Station};

/// Green to red, indexed by `color_bucket`.
pub const COLOR_SCALE: [&str; 11] = [
    "#00E540", "#19CE39", "#33B733", "#4CA02C", "#668926", "#7F7220", "#995B19", "#B24413",
    "#CC2D0C", "#E51606", "#FF0000",
];

/// Color of a freshly placed marker, before any metric has arrived.
pub const DEFAULT_MARKER_COLOR: &str = "#000000";

/// Index into `COLOR_SCALE` for `percentage`: `10 - floor(percentage / 10)`.
///
/// Every percentage in [0, 100] lands in the table: 0 up to (but not
/// including) 10 is index 10, the reddest, and exactly 100 is index 0, the
/// greenest. Anything that would index outside the table (negative, 110 and
/// above, NaN, infinite) yields `None`.
pub fn color_bucket(percentage: f64) -> Option<usize> {
    let bin = (percentage / 10.0).floor();
    // NaN fails the range check too.
    if !(0.0..=10.0).contains(&bin) {
        return None;
    }
    Some(10 - bin as usize)
}

/// Percentage that drives a station's color for `channel_id`; zero when the
/// station has no reading for it.
pub fn active_percentage(station: &Station, channel_id: ChannelId) -> f64 {
    station.metric(channel_id).map(|m| m.percentage).unwrap_or(0.0)
}

/// Color for `station` under `channel_id`, or `None` if its percentage is
/// outside the scale.
pub fn marker_color(station: &Station, channel_id: ChannelId) -> Option<&'static str> {
    color_bucket(active_percentage(station, channel_id)).map(|index| COLOR_SCALE[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricReading;

    fn station_with(channel_id: ChannelId, percentage: f64) -> Station {
        let mut station = Station::from_fields(&["station"], &["ANMO"]).unwrap();
        station.record_metric(channel_id, MetricReading { value: 1.0, percentage });
        station
    }

    #[test]
    fn test_zero_percent_is_reddest() {
        assert_eq!(color_bucket(0.0), Some(10));
        assert_eq!(COLOR_SCALE[10], "#FF0000");
    }

    #[test]
    fn test_bin_edges() {
        assert_eq!(color_bucket(9.99), Some(10));
        assert_eq!(color_bucket(10.0), Some(9));
        assert_eq!(color_bucket(42.5), Some(6));
        assert_eq!(color_bucket(99.99), Some(1));
    }

    #[test]
    fn test_exactly_one_hundred_maps_to_greenest() {
        assert_eq!(color_bucket(100.0), Some(0));
        assert_eq!(COLOR_SCALE[0], "#00E540");
        // 100–110 share the greenest bin; 110 is the first value past it.
        assert_eq!(color_bucket(109.9), Some(0));
        assert_eq!(color_bucket(110.0), None);
    }

    #[test]
    fn test_negative_and_non_finite_fall_outside_table() {
        assert_eq!(color_bucket(-0.1), None);
        assert_eq!(color_bucket(-50.0), None);
        assert_eq!(color_bucket(f64::NAN), None);
        assert_eq!(color_bucket(f64::INFINITY), None);
        assert_eq!(color_bucket(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_extreme_magnitudes_fall_outside_table() {
        assert_eq!(color_bucket(-1e20), None);
        assert_eq!(color_bucket(1e300), None);
        assert_eq!(color_bucket(-f64::MAX), None);
        assert_eq!(marker_color(&station_with(3, -1e20), 3), None);
    }

    #[test]
    fn test_every_percentage_below_100_maps_to_a_defined_color() {
        let mut p = 0.0;
        while p < 100.0 {
            let index = color_bucket(p).expect("in-range percentage must have a color");
            assert!(index < COLOR_SCALE.len());
            p += 0.25;
        }
    }

    #[test]
    fn test_greenness_never_increases_as_percentage_decreases() {
        let mut previous = color_bucket(100.0).unwrap();
        let mut p = 100.0;
        while p >= 0.0 {
            let index = color_bucket(p).unwrap();
            assert!(
                index >= previous,
                "bucket went greener ({} -> {}) as percentage dropped to {}",
                previous,
                index,
                p
            );
            previous = index;
            p -= 0.5;
        }
    }

    #[test]
    fn test_missing_metric_colors_as_zero_percent() {
        let station = station_with(3, 95.0);
        assert_eq!(marker_color(&station, 3), Some(COLOR_SCALE[1]));
        assert_eq!(marker_color(&station, 4), Some("#FF0000"));
    }

    #[test]
    fn test_out_of_range_percentage_has_no_color() {
        let station = station_with(3, 250.0);
        assert_eq!(marker_color(&station, 3), None);
    }
}
