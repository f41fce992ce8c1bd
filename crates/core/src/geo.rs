use serde::{Deserialize, Serialize};

/// Geographic signal for the viewer, typically resolved at the edge.
///
/// Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoSignal {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub georegion: Option<String>,
    #[serde(default)]
    pub dma: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Result of looking up a geo condition key on a [`GeoSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoField<'a> {
    /// The key names no geo field.
    Unknown,
    /// A recognized field with no value.
    Missing,
    Value(&'a str),
}

impl GeoSignal {
    /// Look up a field by its condition key.
    pub fn field(&self, key: &str) -> GeoField<'_> {
        let value = match key {
            "city" => &self.city,
            "continent" => &self.continent,
            "georegion" => &self.georegion,
            "dma" => &self.dma,
            "country_code" => &self.country_code,
            _ => return GeoField::Unknown,
        };
        value.as_deref().map_or(GeoField::Missing, GeoField::Value)
    }

    /// Condition keys that address a geo field.
    pub const FIELDS: [&'static str; 5] = ["city", "continent", "georegion", "dma", "country_code"];
}
