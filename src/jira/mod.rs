//! Jira integration.
//!
//! This module provides the metadata lookup contract used by the
//! aggregation engine and its Jira REST implementation.

pub mod client;
pub mod fetcher;

pub use client::{JiraClient, JiraClientConfig};
pub use fetcher::MetadataFetcher;
