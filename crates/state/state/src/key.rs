use serde::{Deserialize, Serialize};

use paygate_core::RuleId;

/// The kind of document stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// The serialized rule set, exactly as fetched.
    RuleSet,
    /// The serialized entitlement document.
    Entitlements,
    /// Budget ledger entry for one rule.
    RuleData(RuleId),
    Custom(String),
}

impl KeyKind {
    /// Return a string representation of the key kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RuleSet => "rule_set",
            Self::Entitlements => "entitlements",
            Self::RuleData(_) => "rule_data",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleData(id) => write!(f, "rule_data:{id}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Key used to address entries in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub namespace: String,
    pub kind: KeyKind,
}

impl StateKey {
    /// Create a new state key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
        }
    }

    #[must_use]
    pub fn rule_set(namespace: impl Into<String>) -> Self {
        Self::new(namespace, KeyKind::RuleSet)
    }

    #[must_use]
    pub fn entitlements(namespace: impl Into<String>) -> Self {
        Self::new(namespace, KeyKind::Entitlements)
    }

    #[must_use]
    pub fn rule_data(namespace: impl Into<String>, id: RuleId) -> Self {
        Self::new(namespace, KeyKind::RuleData(id))
    }

    /// Return a canonical string representation: `namespace:kind`
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.namespace, self.kind)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
