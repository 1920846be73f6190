//! Three-stage fetch-and-join pipeline.
//!
//! Station locations (FDSN) → catalog (DQA) → metric values (DQA). Each
//! stage runs only after the previous one has returned, and each catches its
//! own failures at the boundary: a failure is logged, recorded in the run
//! report, and moves the pipeline to `Failed(stage)`. Nothing is retried.
//!
//! Metric values can be re-requested at any time through `select_metric`.
//! Every request carries a `MetricTicket`; a response is only applied if
//! its ticket is still the latest, so a slow response for an earlier
//! selection can never overwrite a newer one.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::display::{self, DEFAULT_MARKER_COLOR, Presenter};
use crate::ingest::dqa::{self, CatalogRow};
use crate::ingest::fdsn::{self, StationTextParser};
use crate::ingest::http::Fetcher;
use crate::logging::{self, DataSource};
use crate::model::{ChannelId, FetchError};
use crate::registry::{ChannelChange, MetricBatchSummary, MetricTicket, Registry};
use crate::report::RunReport;

/// Message shown to the user when the station query matches nothing.
pub const NO_STATIONS_ALERT: &str = "No Stations found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Locations,
    Catalog,
    Metrics,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Locations => write!(f, "Station locations"),
            Stage::Catalog => write!(f, "Metric catalog"),
            Stage::Metrics => write!(f, "Metric values"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    FetchingLocations,
    FetchingCatalog,
    FetchingMetrics,
    Ready,
    Failed(Stage),
}

pub struct Pipeline<F: Fetcher, P: Presenter> {
    config: Config,
    fetcher: F,
    presenter: P,
    registry: Registry,
    parser: StationTextParser,
    state: PipelineState,
    report: RunReport,
}

impl<F: Fetcher, P: Presenter> Pipeline<F, P> {
    pub fn new(config: Config, fetcher: F, presenter: P) -> Self {
        let registry = Registry::new(config.metrics.initial_channel);
        Pipeline {
            config,
            fetcher,
            presenter,
            registry,
            parser: StationTextParser::new(),
            state: PipelineState::Idle,
            report: RunReport::new(Utc::now()),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Runs all three stages, using today's UTC date for the station query.
    pub fn run(&mut self) -> PipelineState {
        self.run_on(Utc::now().date_naive())
    }

    /// Runs all three stages with `today` as the station query start date.
    pub fn run_on(&mut self, today: NaiveDate) -> PipelineState {
        self.set_state(PipelineState::FetchingLocations);
        if let Err(err) = self.load_locations(today) {
            if err == FetchError::NotFound {
                self.presenter.alert(NO_STATIONS_ALERT);
            }
            self.fail(Stage::Locations, &err);
            return self.state;
        }

        self.set_state(PipelineState::FetchingCatalog);
        if let Err(err) = self.load_catalog() {
            self.fail(Stage::Catalog, &err);
            return self.state;
        }

        self.finish_metrics_stage()
    }

    /// Makes `channel_id` the active metric and, once the catalog is
    /// loaded, re-requests metric values for it.
    pub fn select_metric(&mut self, channel_id: ChannelId) -> Result<MetricBatchSummary, FetchError> {
        self.registry.set_active_channel(channel_id);

        let name = self.registry.channel_name(channel_id).unwrap_or("<unlisted>").to_string();
        logging::info(
            DataSource::Dqa,
            None,
            &format!("Active metric is now {} ({})", channel_id, name),
        );

        if !self.catalog_loaded() {
            logging::debug(
                DataSource::Dqa,
                None,
                "Catalog not loaded yet, metric values will follow the first run",
            );
            return Ok(MetricBatchSummary::default());
        }

        let previous = self.state;
        self.set_state(PipelineState::FetchingMetrics);
        let result = self.refresh_metrics();
        match &result {
            Ok(_) => self.set_state(PipelineState::Ready),
            // A newer request owns the outcome now.
            Err(FetchError::Aborted) => self.set_state(previous),
            Err(err) => self.fail(Stage::Metrics, err),
        }
        result
    }

    /// Requests and applies metric values for the active channel.
    pub fn refresh_metrics(&mut self) -> Result<MetricBatchSummary, FetchError> {
        if self.registry.station_ids().is_empty() {
            logging::warn(
                DataSource::Dqa,
                None,
                "No catalog station ids known, skipping metric request",
            );
            return Ok(MetricBatchSummary::default());
        }

        let ticket = self.begin_metric_request();
        let body = self.fetch_metrics(&ticket)?;
        self.apply_metric_response(&ticket, &body)
    }

    /// Issues a ticket for a metric-values request on the active channel,
    /// superseding any request still outstanding.
    pub fn begin_metric_request(&mut self) -> MetricTicket {
        self.report.metrics.requests += 1;
        self.registry.begin_metric_request()
    }

    /// Sends the stationgrid request for `ticket`.
    pub fn fetch_metrics(&self, ticket: &MetricTicket) -> Result<String, FetchError> {
        dqa::fetch_grid_text(
            &self.fetcher,
            &self.config.metrics,
            &self.registry.station_ids(),
            ticket.channel_id(),
        )
    }

    /// Applies a stationgrid response. Fails with `FetchError::Aborted` if a
    /// newer request has been issued since `ticket`.
    pub fn apply_metric_response(
        &mut self,
        ticket: &MetricTicket,
        body: &str,
    ) -> Result<MetricBatchSummary, FetchError> {
        if !self.registry.is_current(ticket) {
            return Err(self.discard_superseded(ticket));
        }

        let mut rows = Vec::new();
        let mut rejected = 0;
        for (line, result) in dqa::metric_rows(body) {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => {
                    rejected += 1;
                    logging::warn(DataSource::Dqa, None, &format!("Skipping metric row '{}': {}", line, e));
                }
            }
        }
        let total = rows.len() + rejected;

        let summary = match self.registry.apply_metrics(ticket, rows) {
            Ok(summary) => summary,
            Err(_) => return Err(self.discard_superseded(ticket)),
        };

        let channel_id = ticket.channel_id();
        for name in &summary.updated {
            if let Some(station) = self.registry.station(name) {
                let color = match display::marker_color(station, channel_id) {
                    Some(color) => color,
                    None => {
                        logging::warn(
                            DataSource::Display,
                            Some(station.name()),
                            &format!(
                                "Percentage {} is outside the color scale",
                                display::color::active_percentage(station, channel_id)
                            ),
                        );
                        DEFAULT_MARKER_COLOR
                    }
                };
                self.presenter.recolor(station, color);
            }
        }

        self.report.metrics.rows_applied += summary.updated.len();
        self.report.metrics.rows_rejected += rejected;
        self.report
            .metrics
            .unresolved_station_ids
            .extend(summary.unresolved.iter().copied());

        logging::log_stage_summary(
            DataSource::Dqa,
            &Stage::Metrics.to_string(),
            total,
            summary.updated.len(),
            total - summary.updated.len(),
        );

        Ok(summary)
    }

    // --- Stages -------------------------------------------------------------

    fn load_locations(&mut self, today: NaiveDate) -> Result<(), FetchError> {
        let body = fdsn::fetch_station_text(&self.fetcher, &self.config.stations, today)?;

        let rows = self
            .parser
            .rows(&body)
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        let mut loaded = 0;
        let mut rejected = 0;
        for (line, result) in rows {
            match result {
                Ok(station) => {
                    self.presenter.place_marker(&station);
                    if self.registry.insert_station(station).is_some() {
                        logging::debug(DataSource::Fdsn, None, &format!("Station replaced by row '{}'", line));
                    }
                    loaded += 1;
                }
                Err(e) => {
                    rejected += 1;
                    logging::warn(DataSource::Fdsn, None, &format!("Skipping station row '{}': {}", line, e));
                }
            }
        }
        self.report.locations.rows_loaded += loaded;
        self.report.locations.rows_rejected += rejected;

        logging::log_stage_summary(
            DataSource::Fdsn,
            &Stage::Locations.to_string(),
            loaded + rejected,
            loaded,
            rejected,
        );

        let points = display::heatmap_points(self.registry.stations());
        self.report.locations.heatmap_points = points.len();
        self.presenter.build_heatmap(&points);

        Ok(())
    }

    fn load_catalog(&mut self) -> Result<(), FetchError> {
        let body = dqa::fetch_catalog_text(&self.fetcher, &self.config.metrics)?;

        let mut total = 0;
        let mut rejected = 0;
        for (line, result) in dqa::catalog_rows(&body) {
            total += 1;
            match result {
                Ok(CatalogRow::Station { id, name, .. }) => {
                    self.report.catalog.stations += 1;
                    if self.registry.record_station_id(id, &name) {
                        self.report.catalog.stations_stamped += 1;
                    } else {
                        logging::debug(
                            DataSource::Registry,
                            Some(&name),
                            &format!("Catalog station {} is not in the station list", id),
                        );
                    }
                }
                Ok(CatalogRow::Metric { id, name }) => {
                    self.report.catalog.metrics += 1;
                    match self.registry.record_channel(id, &name) {
                        ChannelChange::New | ChannelChange::Renamed => {
                            self.presenter.offer_metric_option(id, &name)
                        }
                        ChannelChange::Unchanged => {}
                    }
                }
                Ok(CatalogRow::DateStart(date)) => self.registry.set_catalog_start(date),
                Ok(CatalogRow::DateEnd(date)) => self.registry.set_catalog_end(date),
                Ok(_) => self.report.catalog.rows_ignored += 1,
                Err(e) => {
                    rejected += 1;
                    logging::warn(DataSource::Dqa, None, &format!("Skipping catalog row '{}': {}", line, e));
                }
            }
        }

        self.report.catalog.rows_rejected += rejected;
        let dates = self.registry.catalog_dates();
        self.report.catalog.first_date = dates.start;
        self.report.catalog.last_date = dates.end;

        logging::log_stage_summary(
            DataSource::Dqa,
            &Stage::Catalog.to_string(),
            total,
            total - rejected,
            rejected,
        );

        Ok(())
    }

    fn finish_metrics_stage(&mut self) -> PipelineState {
        self.set_state(PipelineState::FetchingMetrics);
        match self.refresh_metrics() {
            Ok(_) => self.set_state(PipelineState::Ready),
            Err(err) => self.fail(Stage::Metrics, &err),
        }
        self.state
    }

    // --- Helpers ------------------------------------------------------------

    fn catalog_loaded(&self) -> bool {
        matches!(
            self.state,
            PipelineState::Ready | PipelineState::Failed(Stage::Metrics)
        )
    }

    fn discard_superseded(&mut self, ticket: &MetricTicket) -> FetchError {
        self.report.metrics.responses_superseded += 1;
        let err = FetchError::Aborted;
        logging::log_fetch_failure(
            DataSource::Dqa,
            &format!("Metric request #{}", ticket.generation()),
            &err,
        );
        err
    }

    fn fail(&mut self, stage: Stage, err: &FetchError) {
        let source = match stage {
            Stage::Locations => DataSource::Fdsn,
            Stage::Catalog | Stage::Metrics => DataSource::Dqa,
        };
        logging::log_fetch_failure(source, &stage.to_string(), err);
        self.report.record_failure(stage, err);
        self.set_state(PipelineState::Failed(stage));
    }

    fn set_state(&mut self, state: PipelineState) {
        self.state = state;
        self.report.final_state = state;
    }
}
