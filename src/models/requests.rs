//! Request DTOs for the inspection API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::scheduler::{RunRequest, MAX_BATCH_SIZE, MAX_INTER_BATCH_DELAY_SECS};

/// Upper bound on URLs accepted in one request
pub const MAX_URLS_PER_REQUEST: usize = 2000;

/// Request body for `POST /inspect`
///
/// # Fields
/// - `property`: the verified property to inspect against
/// - `urls`: raw URL strings, duplicates and blank lines allowed
/// - `force_refresh`: skip cached results
/// - `batch_size`: optional per-run batch size, `1..=100`
/// - `inter_batch_delay_secs`: optional per-run pause, `0..=60`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectRequest {
    pub property: String,
    pub urls: Vec<String>,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub inter_batch_delay_secs: Option<u64>,
}

impl InspectRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.property.trim().is_empty() {
            return Some("Property cannot be empty".to_string());
        }
        if self.urls.iter().all(|u| u.trim().is_empty()) {
            return Some("No URLs to inspect".to_string());
        }
        if self.urls.len() > MAX_URLS_PER_REQUEST {
            return Some(format!(
                "Too many URLs: {} (maximum {})",
                self.urls.len(),
                MAX_URLS_PER_REQUEST
            ));
        }
        if let Some(size) = self.batch_size {
            if !(1..=MAX_BATCH_SIZE).contains(&size) {
                return Some(format!("Batch size must be between 1 and {}", MAX_BATCH_SIZE));
            }
        }
        if let Some(secs) = self.inter_batch_delay_secs {
            if secs > MAX_INTER_BATCH_DELAY_SECS {
                return Some(format!(
                    "Inter-batch delay must be at most {} seconds",
                    MAX_INTER_BATCH_DELAY_SECS
                ));
            }
        }
        None
    }
}

impl From<InspectRequest> for RunRequest {
    fn from(req: InspectRequest) -> Self {
        RunRequest::new(req.property, req.urls)
            .force_refresh(req.force_refresh)
            .batch_size(req.batch_size)
            .inter_batch_delay_secs(req.inter_batch_delay_secs)
    }
}
