use thiserror::Error;

/// Errors that can occur while interpreting rule parameters.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The positional entitlement parameter list has the wrong shape.
    #[error("malformed entitlement parameters: {0}")]
    MalformedEntitlementParams(String),

    /// A weekly budget names a day that is not a weekday.
    #[error("invalid weekday: {0}")]
    InvalidWeekday(String),

    /// An unknown IANA timezone name was supplied.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}
