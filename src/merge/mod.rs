//! Multi-source table reconciliation.
//!
//! Several tabular sources, each with its own headers, are folded into a
//! single row set keyed by a join column. [`reconcile`] is the pure merge;
//! [`MergeSession`] owns the loaded tables and caches the latest result.

pub mod reconcile;
pub mod session;
pub mod table;

pub use reconcile::reconcile;
pub use session::MergeSession;
pub use table::{MergedRowSet, SourceTable};
