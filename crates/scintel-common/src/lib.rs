//! Shared data model for the scintel harvester.
//!
//! [`types`] holds the snapshot schema handed to the presentation layer,
//! [`feeds`] the normalized records each source connector produces, and
//! [`text`] the small matching helpers both the connectors and the risk
//! rules rely on.

pub mod feeds;
pub mod text;
pub mod types;
