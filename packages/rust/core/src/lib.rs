//! Pipeline orchestration for serpcluster.
//!
//! This crate ties together search, page loading, keyword extraction,
//! clustering and storage into one run (`Pipeline::run`), and defines the
//! request/response contract used by the HTTP front end.

pub mod pipeline;
pub mod service;

#[cfg(test)]
mod testing;

pub use pipeline::{Pipeline, ProgressReporter, RunPhase, RunReport, SilentProgress};
pub use service::{ErrorBody, SUCCESS_MESSAGE, ScrapeRequest, ScrapeResponse, scrape};
