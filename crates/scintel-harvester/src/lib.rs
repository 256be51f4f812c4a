//! Supply-chain intelligence harvester.
//!
//! One invocation is one run: fetch every admitted feed, score the facts,
//! assemble a snapshot and hand it to the fallback writer. The scheduler
//! that triggers runs lives outside this crate.

pub mod assembler;
pub mod config;
pub mod connectors;
pub mod context;
pub mod run;
pub mod watchlist;

pub use config::Config;
pub use connectors::ConnectorPlan;
pub use run::{Harvester, RunReport};
