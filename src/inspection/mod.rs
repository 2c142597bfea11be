//! Inspection Module
//!
//! Remote inspection client, result model and URL canonicalization.

mod client;
mod normalize;
mod result;

pub use client::{classify_status, Inspector, SearchConsoleClient, StaticTokenProvider, TokenProvider};
pub use normalize::{normalize, Fingerprint, NormalizedUrl};
pub use result::{CrawlType, InspectionResult, Source};
