//! Remote listing access
//!
//! - Listing: WebDAV/HTTP directory pages and JSON arrays of URLs

pub mod listing;

pub use listing::{DirectoryLoader, ListingError};
