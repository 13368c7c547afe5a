// Dashboard resources: the registry of queryable collections, their field
// configuration, and the HTTP handlers that drive the generic engine.

pub mod fields;
pub mod handlers;
pub mod registry;
