use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

use gsn_monitor::config::Config;
use gsn_monitor::display::LogPresenter;
use gsn_monitor::ingest::http::HttpFetcher;
use gsn_monitor::logging::{self, DataSource};
use gsn_monitor::pipeline::{Pipeline, PipelineState, Stage};
use gsn_monitor::report::print_summary;

fn main() -> ExitCode {
    match run() {
        Ok(state) if state == PipelineState::Failed(Stage::Locations) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gsn_monitor: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<PipelineState, Box<dyn Error>> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );
    logging::info(
        DataSource::System,
        None,
        &format!(
            "Fetching network {} from {}",
            config.stations.network, config.stations.url
        ),
    );

    let fetcher = HttpFetcher::new(Duration::from_secs(config.http.timeout_secs))?;
    let json_path = config.report.json_path.clone();

    let mut pipeline = Pipeline::new(config, fetcher, LogPresenter::new());
    let state = pipeline.run();

    print_summary(pipeline.report());

    if let Some(path) = json_path {
        pipeline.report().write_json(&path)?;
        logging::info(DataSource::System, None, &format!("Report written to {}", path));
    }

    Ok(state)
}
