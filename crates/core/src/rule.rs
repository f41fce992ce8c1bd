use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::budget::Budget;

/// Identifier assigned to a rule by the rule service.
pub type RuleId = i64;

/// A single inclusion or exclusion test against one page attribute.
///
/// With `is_inclusion` set, the attribute must be one of `values`; otherwise
/// it must be none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub is_inclusion: bool,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Condition {
    /// An `IN` condition over the given values.
    pub fn include<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_inclusion: true,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// An `OUT` condition over the given values.
    pub fn exclude<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_inclusion: false,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `value` satisfies this condition.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        let listed = self.values.iter().any(|v| v == value);
        listed == self.is_inclusion
    }
}

/// Outcome a rule produces when it applies to a page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RuleType {
    #[default]
    ShowOnMatch,
    HideOnMatch,
}

/// An access rule as delivered by the rule service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    /// Page-attribute conditions (device type, section, content type, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<HashMap<String, Condition>>,
    /// Conditions over the viewer's geographic signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_conditions: Option<HashMap<String, Condition>>,
    /// Skus whose holders are exempt from this rule.
    #[serde(default)]
    pub excluded_skus: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_length: Option<String>,
    #[serde(default)]
    pub rule_type: RuleType,
    pub budget: Budget,
    /// Number of views the budget allows. `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Rule {
    /// Create a rule with no conditions, no exclusions and no campaign.
    pub fn new(id: RuleId, rule_type: RuleType, budget: Budget) -> Self {
        Self {
            id,
            conditions: None,
            geo_conditions: None,
            excluded_skus: BTreeSet::new(),
            campaign_code: None,
            campaign_length: None,
            rule_type,
            budget,
            limit: None,
        }
    }

    /// Add a page-attribute condition.
    #[must_use]
    pub fn with_condition(mut self, key: impl Into<String>, condition: Condition) -> Self {
        self.conditions
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), condition);
        self
    }

    /// Add a geographic condition.
    #[must_use]
    pub fn with_geo_condition(mut self, key: impl Into<String>, condition: Condition) -> Self {
        self.geo_conditions
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), condition);
        self
    }

    /// Exempt holders of `sku` from this rule.
    #[must_use]
    pub fn with_excluded_sku(mut self, sku: impl Into<String>) -> Self {
        self.excluded_skus.insert(sku.into());
        self
    }

    #[must_use]
    pub fn with_campaign(mut self, code: impl Into<String>) -> Self {
        self.campaign_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The active rule set, in evaluation order.
///
/// Serialized as a bare JSON array. A set parsed with
/// [`from_document`](Self::from_document) keeps the service's document
/// verbatim, and [`to_document`](Self::to_document) returns it unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    #[serde(skip)]
    document: Option<String>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            document: None,
        }
    }

    /// Parse a rule service document, keeping its text.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `document` is not a rule array.
    pub fn from_document(document: impl Into<String>) -> Result<Self, serde_json::Error> {
        let document = document.into();
        let rules = serde_json::from_str(&document)?;
        Ok(Self {
            rules,
            document: Some(document),
        })
    }

    /// The document to cache: the original text when there is one.
    ///
    /// # Errors
    ///
    /// Returns the serialization error for a set built in code.
    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        match &self.document {
            Some(document) => Ok(document.clone()),
            None => serde_json::to_string(self),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Look up a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
