//! Station details fragment for info panels.

use std::collections::BTreeMap;

use maud::{Markup, html};

use crate::model::{ChannelId, Station};

/// Base URL of the DMC MetaData Aggregator station pages.
pub const MDA_BASE_URL: &str = "http://ds.iris.edu/mda";

/// Renders `station` as an HTML list group: metadata, a MetaData Aggregator
/// link, then one line per recorded metric with its percentage to two
/// decimals. Metrics missing from `channel_names` are labelled by id.
pub fn render_details(station: &Station, channel_names: &BTreeMap<ChannelId, String>) -> String {
    details_markup(station, channel_names).into_string()
}

fn details_markup(station: &Station, channel_names: &BTreeMap<ChannelId, String>) -> Markup {
    html! {
        ul.list-group {
            li.list-group-item.active { (station.site_name) }
            li.list-group-item { "Network: " (station.network) }
            li.list-group-item { "Station: " (station.name()) }
            li.list-group-item { "Latitude: " (station.latitude) }
            li.list-group-item { "Longitude: " (station.longitude) }
            li.list-group-item { "Elevation: " (station.elevation) }
            li.list-group-item { "Start Time: " (station.start_time) }
            li.list-group-item { "End Time: " (station.end_time) }
            li.list-group-item {
                a href=(format!("{}/{}/{}", MDA_BASE_URL, station.network, station.name())) target="_blank" {
                    "DMC MetaData Aggregator"
                }
            }
            @for (channel_id, reading) in station.metrics() {
                li.list-group-item {
                    @match channel_names.get(&channel_id) {
                        Some(name) => { (name) }
                        None => { "Metric " (channel_id) }
                    }
                    ": " (format!("{:.2}", reading.percentage)) "%"
                }
            }
        }
    }
}
