use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geo::GeoSignal;

/// A single page view submitted for evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewRequest {
    pub page_id: String,
    /// Caller-supplied page attributes (device type, section, ...).
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub geo: Option<GeoSignal>,
}

impl PageViewRequest {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            attributes: HashMap::new(),
            geo: None,
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_geo(mut self, geo: GeoSignal) -> Self {
        self.geo = Some(geo);
        self
    }
}

/// Decision for one page view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub page_id: String,
    pub show: bool,
    pub campaign: Option<String>,
}

impl EvaluationResult {
    /// The permissive default: show the page, no campaign.
    pub fn allow(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            show: true,
            campaign: None,
        }
    }
}
