//! Insight returned by the reasoning backend.
//!
//! The backend must answer with a JSON object carrying only `alert` and
//! `recommendation`, each a string, null, or absent. Anything else is a
//! malformed response and nothing from it is applied.

use crate::error::InsightError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parsed verdict from the reasoning backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Insight {
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl Insight {
    pub fn new(alert: &str, recommendation: &str) -> Self {
        Self {
            alert: Some(alert.to_string()),
            recommendation: Some(recommendation.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alert.is_none() && self.recommendation.is_none()
    }
}

/// Parse a raw response body into an [`Insight`].
pub fn parse_insight(body: &str) -> Result<Insight, InsightError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(InsightError::MalformedResponse("empty body".to_string()));
    }

    serde_json::from_str::<Insight>(trimmed)
        .map_err(|e| InsightError::MalformedResponse(e.to_string()))
}

/// An insight as published to renderers, stamped with its arrival time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedInsight {
    pub insight: Insight,
    pub received_at: DateTime<Utc>,
}

impl PublishedInsight {
    pub fn now(insight: Insight) -> Self {
        Self {
            insight,
            received_at: Utc::now(),
        }
    }
}
