use std::collections::HashMap;

use paygate_core::{Condition, GeoField, GeoSignal};

/// Match the viewer's geographic signal against a rule's geo conditions.
///
/// Unlike page conditions, an absent or empty condition map always passes:
/// a rule without geo restrictions is never blocked by geography.
///
/// Each condition keyed by one of [`GeoSignal::FIELDS`] passes when the
/// viewer's field value satisfies it; a missing value (or a missing signal)
/// never satisfies a condition. The result is `true` if any field passes.
///
/// When no field passes but the map contains a key that names no geo
/// field, the result is `true`. Product has not confirmed this behavior;
/// it is kept as-is until they do.
pub fn evaluate_geo_conditions(
    conditions: Option<&HashMap<String, Condition>>,
    geo: Option<&GeoSignal>,
) -> bool {
    let Some(conditions) = conditions.filter(|c| !c.is_empty()) else {
        return true;
    };

    let mut unrecognized = false;
    for (key, condition) in conditions {
        let field = match geo {
            Some(signal) => signal.field(key),
            None if GeoSignal::FIELDS.contains(&key.as_str()) => GeoField::Missing,
            None => GeoField::Unknown,
        };
        match field {
            GeoField::Value(value) if condition.accepts(value) => return true,
            GeoField::Value(_) | GeoField::Missing => {}
            GeoField::Unknown => unrecognized = true,
        }
    }

    unrecognized
}
