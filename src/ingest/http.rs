//! HTTP transport shared by both services.
//!
//! `Fetcher` is the seam between the pipeline and the network: the
//! production implementation wraps a `reqwest::blocking::Client`, tests
//! substitute scripted responses.

use std::time::Duration;

use reqwest::StatusCode;

use crate::model::FetchError;

/// Issues a GET request and returns the body as text.
pub trait Fetcher {
    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError>;
}

/// `Fetcher` backed by a blocking reqwest client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<HttpFetcher, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(classify_transport_error)?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(classify_transport_error)?;

        check_status(response.status())?;

        response.text().map_err(classify_transport_error)
    }
}

/// Maps a non-2xx status onto the failure taxonomy.
pub fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound)
    } else if status.is_server_error() {
        Err(FetchError::ServerError(status.as_u16()))
    } else {
        Err(FetchError::Unknown(format!("HTTP {}", status)))
    }
}

fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::Connectivity(err.to_string())
    } else if err.is_decode() || err.is_body() {
        FetchError::Malformed(err.to_string())
    } else if let Some(status) = err.status() {
        match check_status(status) {
            Err(classified) => classified,
            Ok(()) => FetchError::Unknown(err.to_string()),
        }
    } else {
        FetchError::Unknown(err.to_string())
    }
}
