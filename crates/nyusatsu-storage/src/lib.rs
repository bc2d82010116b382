//! Canonical tender store + HTTP fetch utilities for nyusatsu.

pub mod http;
pub mod store;

pub use http::{
    classify_reqwest_error, classify_status, BackoffPolicy, FetchError, FetchedResponse,
    HttpClientConfig, HttpFetcher, RetryDisposition,
};
pub use store::{EnrichmentUpdate, MergeOutcome, StoreError, TenderStore};

pub const CRATE_NAME: &str = "nyusatsu-storage";
