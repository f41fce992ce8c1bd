use serde::{Deserialize, Serialize};

/// A purchased product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku {
    pub id: String,
}

impl Sku {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The viewer's entitlement document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    #[serde(default)]
    pub skus: Vec<Sku>,
}

impl Entitlements {
    pub fn new<I, S>(skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skus: skus.into_iter().map(Sku::new).collect(),
        }
    }

    /// Returns `true` if the viewer owns `sku`.
    pub fn has_sku(&self, sku: &str) -> bool {
        self.skus.iter().any(|s| s.id == sku)
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }
}
