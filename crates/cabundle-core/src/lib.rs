//! Core types and traits for the CA bundle synchronization operator.
//!
//! This crate provides the foundational pieces shared by the fetcher, the
//! synchronization engine and the operator binary:
//!
//! - **Types**: [`BundleRecord`], [`ResourceId`], [`KvResource`], [`TrustResource`]
//! - **Normalization**: [`normalize`] maps a published file name to a resource name
//! - **Seams**: the [`BundleSource`] and [`ClusterClient`] traits
//! - **Errors**: [`FetchError`] and [`ClusterError`]
//!
//! # Example
//!
//! ```rust
//! use cabundle_core::{normalize, ResourceId};
//!
//! assert_eq!(normalize("My Root CA.pem"), "my-root-ca");
//! assert_eq!(ResourceId::from_logical_name("intermediate.crt").as_str(), "intermediate");
//! ```

#![doc(html_root_url = "https://docs.rs/cabundle-core/0.3.0")]

mod cluster;
mod error;
mod normalize;
mod source;
pub mod types;

pub use cluster::ClusterClient;
pub use error::{ClusterError, ClusterResult, FetchError, FetchResult};
pub use normalize::{normalize, strip_bundle_suffix, BUNDLE_SUFFIXES, SEPARATOR};
pub use source::BundleSource;
pub use types::*;
