//! Presentation adapter.
//!
//! The pipeline never draws anything itself; it tells a `Presenter` what
//! changed. The map front-end (markers, icons, info windows, metric
//! selector, heatmap layer) lives behind this trait.
//!
//! Submodules:
//! - `color`   — percentage to marker color.
//! - `details` — HTML fragment for a station's info panel.

pub mod color;
pub mod details;

use crate::logging::{self, DataSource};
use crate::model::{ChannelId, Station};

pub use color::{COLOR_SCALE, DEFAULT_MARKER_COLOR, color_bucket, marker_color};
pub use details::render_details;

/// Radius, in pixels, of each heatmap point.
pub const HEATMAP_RADIUS: u32 = 100;

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Receives registry changes from the pipeline. Presenters read station
/// state; they never write it.
pub trait Presenter {
    /// A station was registered and needs a marker.
    fn place_marker(&mut self, station: &Station);

    /// A station's marker color changed.
    fn recolor(&mut self, station: &Station, color: &str);

    /// The catalog offers a metric the user can select.
    fn offer_metric_option(&mut self, channel_id: ChannelId, name: &str);

    /// All markers are placed; build the density overlay.
    fn build_heatmap(&mut self, points: &[HeatmapPoint]);

    /// A condition the user must be told about directly.
    fn alert(&mut self, message: &str);
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Marker positions for the heatmap. Stations whose coordinates do not
/// parse are left out and logged.
pub fn heatmap_points<'a, I>(stations: I) -> Vec<HeatmapPoint>
where
    I: IntoIterator<Item = &'a Station>,
{
    stations
        .into_iter()
        .filter_map(|station| match marker_position(station) {
            Some(point) => Some(point),
            None => {
                logging::warn(
                    DataSource::Display,
                    Some(station.name()),
                    &format!(
                        "Unusable coordinates ({}, {}), left off heatmap",
                        station.latitude, station.longitude
                    ),
                );
                None
            }
        })
        .collect()
}

/// Parsed marker position of `station`, if its coordinates are numeric.
pub fn marker_position(station: &Station) -> Option<HeatmapPoint> {
    let latitude: f64 = station.latitude.trim().parse().ok()?;
    let longitude: f64 = station.longitude.trim().parse().ok()?;
    Some(HeatmapPoint { latitude, longitude })
}

// ---------------------------------------------------------------------------
// LogPresenter
// ---------------------------------------------------------------------------

/// `Presenter` that reports every call through the logging module. Used by
/// the command-line binary, where there is no map to draw on.
#[derive(Debug, Default)]
pub struct LogPresenter {
    markers: usize,
    recolors: usize,
    options: Vec<(ChannelId, String)>,
}

impl LogPresenter {
    pub fn new() -> LogPresenter {
        LogPresenter::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers
    }

    pub fn recolor_count(&self) -> usize {
        self.recolors
    }

    /// Metric options offered so far, in offer order.
    pub fn options(&self) -> &[(ChannelId, String)] {
        &self.options
    }
}

impl Presenter for LogPresenter {
    fn place_marker(&mut self, station: &Station) {
        self.markers += 1;
        logging::debug(
            DataSource::Display,
            Some(station.name()),
            &format!(
                "Marker at ({}, {}) {} {}",
                station.latitude, station.longitude, station.site_name, DEFAULT_MARKER_COLOR
            ),
        );
    }

    fn recolor(&mut self, station: &Station, color: &str) {
        self.recolors += 1;
        logging::debug(DataSource::Display, Some(station.name()), &format!("Marker color {}", color));
    }

    fn offer_metric_option(&mut self, channel_id: ChannelId, name: &str) {
        self.options.push((channel_id, name.to_string()));
        logging::info(
            DataSource::Display,
            None,
            &format!("Metric option {}: {}", channel_id, name),
        );
    }

    fn build_heatmap(&mut self, points: &[HeatmapPoint]) {
        logging::info(
            DataSource::Display,
            None,
            &format!("Heatmap built from {} points (radius {})", points.len(), HEATMAP_RADIUS),
        );
    }

    fn alert(&mut self, message: &str) {
        logging::error(DataSource::Display, None, message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, latitude: &str, longitude: &str) -> Station {
        Station::from_fields(
            &["station", "latitude", "longitude"],
            &[name, latitude, longitude],
        )
        .unwrap()
    }

    #[test]
    fn test_marker_position_parses_string_coordinates() {
        let anmo = station("ANMO", "34.9", "-106.4");
        assert_eq!(
            marker_position(&anmo),
            Some(HeatmapPoint { latitude: 34.9, longitude: -106.4 })
        );
    }

    #[test]
    fn test_heatmap_skips_unparseable_coordinates() {
        let stations = vec![
            station("ANMO", "34.9", "-106.4"),
            station("BAD", "", "-10"),
            station("ALE", "82.5033", "-62.35"),
        ];
        let points = heatmap_points(&stations);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].latitude, 82.5033);
    }

    #[test]
    fn test_log_presenter_counts_calls() {
        let anmo = station("ANMO", "34.9", "-106.4");
        let mut presenter = LogPresenter::new();
        presenter.place_marker(&anmo);
        presenter.recolor(&anmo, COLOR_SCALE[3]);
        presenter.offer_metric_option(3, "Availability");

        assert_eq!(presenter.marker_count(), 1);
        assert_eq!(presenter.recolor_count(), 1);
        assert_eq!(presenter.options(), &[(3, "Availability".to_string())]);
    }
}
