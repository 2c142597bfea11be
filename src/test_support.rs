//! Shared fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::clock::Clock;
use crate::error::InspectError;
use crate::inspection::{InspectionResult, Inspector};

/// Fixed starting instant for simulated clocks.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
}

/// A minimal live result for `url`.
pub fn result_at(property: &str, url: &str, fetched_at: DateTime<Utc>) -> InspectionResult {
    let payload = json!({
        "inspectionResult": {
            "indexStatusResult": {
                "verdict": "PASS",
                "coverageState": "Submitted and indexed",
                "pageFetchState": "SUCCESSFUL",
                "crawledAs": "MOBILE"
            },
            "mobileUsabilityResult": { "verdict": "PASS" }
        }
    });
    InspectionResult::from_payload(property, url, payload, fetched_at).unwrap()
}

/// Inspector returning scripted outcomes per URL; URLs without a script succeed.
#[derive(Default)]
pub struct ScriptedInspector {
    scripts: Mutex<HashMap<String, VecDeque<InspectError>>>,
    calls: Mutex<Vec<String>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ScriptedInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps results with the time read from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Queues errors returned by the next calls for `url`, in order.
    pub fn fail_with(self, url: &str, errors: Vec<InspectError>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), errors.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Inspector for ScriptedInspector {
    async fn inspect(&self, property: &str, url: &str) -> Result<InspectionResult, InspectError> {
        self.calls.lock().unwrap().push(url.to_string());
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(err) => Err(err),
            None => {
                let fetched_at = self.clock.as_ref().map(|c| c.now()).unwrap_or_else(t0);
                Ok(result_at(property, url, fetched_at))
            }
        }
    }
}
