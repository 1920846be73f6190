//! Service clients and response decoders.
//!
//! Submodules:
//! - `http`  — the `Fetcher` seam and its reqwest implementation.
//! - `fdsn`  — FDSN station web service: station metadata (Stage 1).
//! - `dqa`   — DQA metrics CGI: catalog (Stage 2) and metric values (Stage 3).

pub mod dqa;
pub mod fdsn;
pub mod http;
