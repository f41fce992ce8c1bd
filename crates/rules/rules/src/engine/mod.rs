pub mod condition;
pub mod entitlement;
pub mod geo;
