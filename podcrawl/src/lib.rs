//! podcrawl library interface
//!
//! Discovers podcast shows on a category page and resolves each one against
//! the catalog lookup endpoint concurrently.

pub mod error;
pub mod models;
pub mod options;
pub mod services;

pub use crate::error::ShowError;
pub use crate::models::{Genre, Show, ShowImage};
pub use crate::options::{DiscoveryOptions, RequestOptions};
pub use crate::services::{
    EntityDiscovery, FetchOutcome, LookupClient, PageLinkDiscovery, ShowFetcher, ShowResolver,
};
