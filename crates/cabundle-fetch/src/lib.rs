//! HTTP fetcher for published CA bundles.
//!
//! This crate provides [`BundleFetcher`], the HTTP implementation of
//! [`cabundle_core::BundleSource`]. It reads an anchor-link directory
//! listing, picks every entry ending in a recognized bundle suffix and
//! downloads them all.

#![doc(html_root_url = "https://docs.rs/cabundle-fetch/0.3.0")]

mod client;
pub mod listing;

pub use cabundle_core::{BundleRecord, FetchError, FetchResult};
pub use client::{BundleFetcher, BundleFetcherBuilder};
pub use listing::ListingEntry;
