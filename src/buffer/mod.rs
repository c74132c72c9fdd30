//! In-memory buffering between classification and analysis.
//!
//! Lines flow through a [`ContextWindow`] into the [`IssueAssembler`], sealed
//! issues are grouped by the [`BatchAccumulator`], and everything is recorded
//! in a bounded [`HistoryStore`] for later queries.

pub mod batch;
pub mod history;
pub mod issue;
pub mod window;

pub use batch::{BatchAccumulator, IssueBatch};
pub use history::{HistoryStore, Summary};
pub use issue::{Issue, IssueAssembler};
pub use window::ContextWindow;
