/*!
 * # moontrans
 *
 * Batch translation of the moon calendar reference tables.
 *
 * Reads a source-language table from SQLite, sends its translatable columns
 * to a chat-style translation service in fixed-size batches, repairs and
 * validates the structured answers, and writes every batch to both a CSV
 * review log and the target-language table as a unit.
 *
 * ## Features
 *
 * - Resumable runs driven by the review log
 * - Bounded retry with linear backoff on transient service failures
 * - Repair of fenced or trailing-comma JSON answers
 * - Per-table profiles (moon days, cities, zodiac tables)
 * - Review log import and city seeding from GeoNames
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `database`: SQLite access, import and seeding
 * - `translation`: the batch pipeline:
 *   - `translation::orchestrator`: the run loop
 *   - `translation::client`: service calls with retry
 *   - `translation::reconcile`: response repair and validation
 *   - `translation::sink`: atomic per-batch writes
 * - `providers`: OpenAI, GeoNames and a mock provider
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, PipelineError, ProviderError};
pub use language_utils::{get_language_name, language_codes_match};
pub use translation::{Orchestrator, RunOptions, RunReport, TableProfile};
