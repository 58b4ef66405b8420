//! Work queues, politeness, budgets, and the frontier scheduler

pub mod budget;
pub mod politeness;
pub mod queue;
pub mod record;
pub mod scheduler;

pub use budget::{BudgetLedger, BudgetScope};
pub use politeness::{DefaultPolitenessPolicy, PolitenessPolicy};
pub use queue::{QueueState, WorkQueue};
pub use record::{CompletedRecord, DiscoverySource, FetchOutcome, RetireReason, UriRecord};
pub use scheduler::{Dispatch, Frontier, FrontierStatus, SubmitOutcome};
