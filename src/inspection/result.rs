//! Inspection Result Module
//!
//! Typed view over the remote inspection payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Source ==
/// Where a result came from during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    Live,
    Cached,
}

// == Crawl Type ==
/// Crawler user agent the page was last fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlType {
    Mobile,
    Desktop,
}

impl CrawlType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "MOBILE" => Some(CrawlType::Mobile),
            "DESKTOP" => Some(CrawlType::Desktop),
            _ => None,
        }
    }
}

// == Inspection Result ==
/// Outcome of one successful inspection. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionResult {
    pub url: String,
    pub property: String,
    pub verdict: Option<String>,
    pub coverage_state: Option<String>,
    pub indexing_state: Option<String>,
    pub mobile_usability_verdict: Option<String>,
    pub page_fetch_state: Option<String>,
    pub robots_txt_state: Option<String>,
    pub user_canonical: Option<String>,
    pub google_canonical: Option<String>,
    pub crawl_type: Option<CrawlType>,
    pub last_crawl_time: Option<DateTime<Utc>>,
    pub rich_results_verdict: Option<String>,
    pub rich_result_types: Vec<String>,
    pub inspection_result_link: Option<String>,
    pub raw_payload: Value,
    pub fetched_at: DateTime<Utc>,
    pub source: Source,
}

impl InspectionResult {
    /// Builds a live result from the raw API response body.
    pub fn from_payload(
        property: &str,
        url: &str,
        payload: Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let wire: InspectResponse = serde_json::from_value(payload.clone())?;
        let inspection = wire.inspection_result.unwrap_or_default();
        let index = inspection.index_status_result.unwrap_or_default();
        let rich = inspection.rich_results_result.unwrap_or_default();

        Ok(Self {
            url: url.to_string(),
            property: property.to_string(),
            verdict: index.verdict,
            coverage_state: index.coverage_state,
            indexing_state: index.indexing_state,
            mobile_usability_verdict: inspection.mobile_usability_result.and_then(|m| m.verdict),
            page_fetch_state: index.page_fetch_state,
            robots_txt_state: index.robots_txt_state,
            user_canonical: index.user_canonical,
            google_canonical: index.google_canonical,
            crawl_type: index.crawled_as.as_deref().and_then(CrawlType::parse),
            last_crawl_time: index
                .last_crawl_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
            rich_results_verdict: rich.verdict,
            rich_result_types: rich
                .detected_items
                .into_iter()
                .filter_map(|item| item.rich_result_type)
                .collect(),
            inspection_result_link: inspection.inspection_result_link,
            raw_payload: payload,
            fetched_at,
            source: Source::Live,
        })
    }

    /// Returns a copy tagged with another source.
    pub fn with_source(&self, source: Source) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    /// Whether the page counts as indexed.
    pub fn is_indexed(&self) -> bool {
        if self.verdict.as_deref() == Some("PASS") {
            return true;
        }
        self.coverage_state
            .as_deref()
            .map(|state| {
                let state = state.to_ascii_lowercase();
                state.contains("indexed") && !state.contains("not indexed")
            })
            .unwrap_or(false)
    }
}

// == Wire Format ==
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectResponse {
    inspection_result: Option<WireInspection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInspection {
    inspection_result_link: Option<String>,
    index_status_result: Option<IndexStatus>,
    mobile_usability_result: Option<MobileUsability>,
    rich_results_result: Option<RichResults>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStatus {
    verdict: Option<String>,
    coverage_state: Option<String>,
    indexing_state: Option<String>,
    last_crawl_time: Option<String>,
    page_fetch_state: Option<String>,
    robots_txt_state: Option<String>,
    user_canonical: Option<String>,
    google_canonical: Option<String>,
    crawled_as: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MobileUsability {
    verdict: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RichResults {
    verdict: Option<String>,
    #[serde(default)]
    detected_items: Vec<DetectedItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectedItem {
    rich_result_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "inspectionResult": {
                "inspectionResultLink": "https://search.google.com/search-console/inspect?id=1",
                "indexStatusResult": {
                    "verdict": "PASS",
                    "coverageState": "Submitted and indexed",
                    "indexingState": "INDEXING_ALLOWED",
                    "lastCrawlTime": "2024-04-30T08:15:00Z",
                    "pageFetchState": "SUCCESSFUL",
                    "robotsTxtState": "ALLOWED",
                    "userCanonical": "https://example.com/a",
                    "googleCanonical": "https://example.com/a",
                    "crawledAs": "MOBILE"
                },
                "mobileUsabilityResult": { "verdict": "PASS" },
                "richResultsResult": {
                    "verdict": "PASS",
                    "detectedItems": [
                        { "richResultType": "Breadcrumbs" },
                        { "richResultType": "FAQ" }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_from_payload_maps_fields() {
        let fetched_at = Utc::now();
        let result = InspectionResult::from_payload(
            "https://example.com/",
            "https://example.com/a",
            sample_payload(),
            fetched_at,
        )
        .unwrap();

        assert_eq!(result.coverage_state.as_deref(), Some("Submitted and indexed"));
        assert_eq!(result.mobile_usability_verdict.as_deref(), Some("PASS"));
        assert_eq!(result.page_fetch_state.as_deref(), Some("SUCCESSFUL"));
        assert_eq!(result.crawl_type, Some(CrawlType::Mobile));
        assert_eq!(result.rich_result_types, vec!["Breadcrumbs", "FAQ"]);
        assert!(result.last_crawl_time.is_some());
        assert_eq!(result.source, Source::Live);
        assert_eq!(result.fetched_at, fetched_at);
        assert!(result.is_indexed());
    }

    #[test]
    fn test_from_payload_tolerates_missing_sections() {
        let result =
            InspectionResult::from_payload("p", "u", json!({}), Utc::now()).unwrap();
        assert!(result.coverage_state.is_none());
        assert!(result.crawl_type.is_none());
        assert!(result.rich_result_types.is_empty());
        assert!(!result.is_indexed());
    }

    #[test]
    fn test_is_indexed_rejects_not_indexed_states() {
        let payload = json!({
            "inspectionResult": {
                "indexStatusResult": {
                    "verdict": "NEUTRAL",
                    "coverageState": "Crawled - currently not indexed"
                }
            }
        });
        let result = InspectionResult::from_payload("p", "u", payload, Utc::now()).unwrap();
        assert!(!result.is_indexed());
    }

    #[test]
    fn test_with_source_keeps_payload() {
        let result =
            InspectionResult::from_payload("p", "u", sample_payload(), Utc::now()).unwrap();
        let cached = result.with_source(Source::Cached);
        assert_eq!(cached.source, Source::Cached);
        assert_eq!(cached.raw_payload, result.raw_payload);
        assert_eq!(result.source, Source::Live);
    }
}
