//! Outbound HTTP access.
//!
//! The aggregator only sees the [`JsonFetcher`] trait; [`HttpFetcher`] is
//! the reqwest implementation used by the binary.

pub mod client;

pub use client::{build_role_url, FetchError, HttpFetcher, JsonFetcher, RequestHeaders};
