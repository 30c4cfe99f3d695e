/*!
 * Batch translation and reconciliation pipeline.
 *
 * - `record`: source records, identity keys and batch payloads
 * - `profile`: per-table translation profiles
 * - `ledger`: keys already present in a review log
 * - `batch`: fixed-size partitioning of the work list
 * - `prompts`: system and user messages for a batch
 * - `client`: service calls with bounded retry
 * - `reconcile`: response repair and validation
 * - `sink`: atomic per-batch writes to the review log and target table
 * - `orchestrator`: the run loop
 * - `report`: run statistics
 */

// Re-export main types for easier usage
pub use self::client::{RetryPolicy, TranslationClient};
pub use self::ledger::CompletionLedger;
pub use self::orchestrator::{Orchestrator, RunOptions};
pub use self::profile::{ExpectedShape, TableProfile, builtin_profiles};
pub use self::prompts::PromptTemplate;
pub use self::reconcile::Reconciler;
pub use self::record::{BatchRequest, BatchResponse, CompletionRecord, FieldValue, IdentityKey, SourceRecord};
pub use self::report::{RunReport, TokenUsageStats};
pub use self::sink::{ReviewLog, Sink};

// Submodules
pub mod batch;
pub mod client;
pub mod ledger;
pub mod orchestrator;
pub mod profile;
pub mod prompts;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod sink;
