//! storefront-types: domain model, cart reconciliation rules and port traits

pub mod domain;
pub mod ports;
