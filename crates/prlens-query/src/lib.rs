//! Query router and retrieval core (spec §4.8, §4.9): classifies a
//! free-text query into a `QueryPlan`, then dispatches to the direct,
//! hybrid, or vector handler family.

pub mod classify;
pub mod dedup;
pub mod direct;
pub mod hybrid;
pub mod topics;
pub mod vector;

pub use classify::{classify, Metric, QueryObject, QueryPlan, Route};
pub use dedup::dedupe_prs;
pub use topics::Topic;
