//! Harvest module for concurrent listing page collection
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with readiness polling and retry
//! - Story extraction from listing markup
//! - Worker pool dispatch over the page range
//! - Run assembly and the fixture-driven test mode

mod extractor;
mod fetcher;
mod pool;
mod runner;

pub use extractor::{extract_stories, ExtractError, Story, DEFAULT_SCORE};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher, RawPage};
pub use pool::{AbortHandle, Orchestrator, RunResult};
pub use runner::{run_fixture, run_harvest};

/// Page number within the paginated listing (1-based)
pub type PageIndex = u32;
