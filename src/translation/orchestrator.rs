/*!
 * Table synchronization run.
 *
 * Fetches the source table, drops completed and excluded records, then
 * translates, reconciles and commits one batch at a time. A failing batch
 * aborts the run; batches committed before it stay committed.
 */

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::batch::{self, clamp_batch_size};
use super::client::TranslationClient;
use super::ledger::CompletionLedger;
use super::profile::{Exclusion, TableProfile, WriteMode};
use super::prompts::{PromptTemplate, build_instructions};
use super::reconcile::Reconciler;
use super::record::{BatchRequest, CompletionRecord, IdentityKey, SourceRecord};
use super::report::{RunReport, TokenUsageStats};
use super::sink::{ReviewLog, Sink};
use crate::app_config::Config;
use crate::database::schema::ColumnInfo;
use crate::database::{DatabaseConnection, RecordSource};
use crate::errors::PipelineError;
use crate::language_utils;
use crate::providers::Provider;

/// Per-run options, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip records already present in the review log
    pub resume: bool,
    /// Check the schema and write the review log header only
    pub dry_run: bool,
    /// Read at most this many source rows
    pub limit: Option<usize>,
    /// Records per service call; the profile default when absent
    pub batch_size: Option<i64>,
    /// Review log path; the profile default when absent
    pub review_log: Option<PathBuf>,
    /// Delay between batches; the configured delay when absent
    pub inter_batch_delay: Option<Duration>,
    /// Draw a progress bar
    pub show_progress: bool,
}

/// Drives one profile from source table to target table
#[derive(Debug)]
pub struct Orchestrator<P: Provider> {
    db: DatabaseConnection,
    source: RecordSource,
    client: TranslationClient<P>,
    template: PromptTemplate,
    source_language: String,
    target_language: String,
    model: String,
    inter_batch_delay: Duration,
}

impl<P: Provider> Orchestrator<P> {
    pub fn new(config: &Config, db: DatabaseConnection, provider: Arc<P>) -> Self {
        let common = &config.translation.common;
        let client = TranslationClient::new(
            provider,
            config.translation.provider.model.clone(),
            common.temperature,
            config.retry_policy(),
        );

        Self {
            source: RecordSource::new(db.clone()),
            db,
            client,
            template: PromptTemplate::new(&common.system_prompt),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            model: config.translation.provider.model.clone(),
            inter_batch_delay: config.inter_batch_delay(),
        }
    }

    /// Run a profile to completion or to the first failing batch
    pub async fn run(&self, profile: &TableProfile, options: &RunOptions) -> Result<RunReport> {
        let start = Instant::now();
        profile
            .validate()
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;

        let source_language = profile.source_language.as_deref().unwrap_or(&self.source_language);
        language_utils::validate_language_code(source_language)
            .and_then(|_| language_utils::validate_language_code(&self.target_language))
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;

        let mut report = RunReport {
            profile: profile.name.clone(),
            target_table: profile.target_table.clone(),
            dry_run: options.dry_run,
            usage: TokenUsageStats::with_provider_info(self.client.provider_name(), &self.model),
            ..Default::default()
        };

        let columns = self.select_columns(profile).await?;
        let selected: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let translatable = profile.translatable_columns(&selected);
        if translatable.is_empty() {
            return Err(PipelineError::Config(format!(
                "Profile '{}' has no translatable column among {:?}",
                profile.name, selected
            ))
            .into());
        }

        let header = profile
            .review_header(&selected, source_language, &self.target_language)
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;
        let log_path = options
            .review_log
            .clone()
            .unwrap_or_else(|| PathBuf::from(&profile.review_log));
        let review_log = ReviewLog::new(log_path, header);

        if options.dry_run {
            review_log.reset()?;
            info!(
                "Dry run: {} -> {} schema OK, header written to {:?}",
                profile.source_table,
                profile.target_table,
                review_log.path()
            );
            report.duration = start.elapsed();
            return Ok(report);
        }

        if options.limit.is_some() && profile.write_mode == WriteMode::Replace {
            return Err(PipelineError::Config(format!(
                "Profile '{}' replaces {} as a whole; a row limit would shrink it",
                profile.name, profile.target_table
            ))
            .into());
        }

        let requested = options.batch_size.map(clamp_batch_size).unwrap_or(profile.batch_size);
        let batch_size = profile.effective_batch_size(requested);
        if batch_size != requested {
            warn!(
                "Batch size {} adjusted to {} for {:?}-shaped responses",
                requested, batch_size, profile.shape
            );
        }

        let ledger = match (options.resume, profile.write_mode) {
            (false, _) => CompletionLedger::new(),
            (true, WriteMode::Replace) => {
                warn!("Profile '{}' replaces its target table; resume is ignored", profile.name);
                CompletionLedger::new()
            }
            (true, WriteMode::Append) => CompletionLedger::load(review_log.path(), &profile.key_columns)?,
        };

        let records = self.source.fetch(&profile.source_table, &selected, options.limit).await?;
        report.source_records = records.len();

        let (pending, skipped_completed) = drop_completed(records, &ledger, &profile.key_columns);
        report.skipped_completed = skipped_completed;

        let existing = if profile.write_mode == WriteMode::Append
            || profile.exclusions.contains(&Exclusion::SkipExistingKeys)
        {
            self.source.existing_keys(&profile.target_table, &profile.key_columns).await?
        } else {
            HashSet::new()
        };
        let (pending, skipped_excluded) = apply_exclusions(pending, profile, &existing);
        report.skipped_excluded = skipped_excluded;

        // Appended tables never receive a key twice, resumed or not
        let work = match profile.write_mode {
            WriteMode::Append => {
                let (work, in_target) = drop_present_in_target(pending, &existing, &profile.key_columns);
                if in_target > 0 {
                    info!("{}: {} records already in {}", profile.name, in_target, profile.target_table);
                }
                report.skipped_completed += in_target;
                work
            }
            WriteMode::Replace => pending,
        };

        info!(
            "{}: {} source records, {} already done, {} excluded, {} to translate",
            profile.name,
            report.source_records,
            report.skipped_completed,
            report.skipped_excluded,
            work.len()
        );

        if work.is_empty() {
            info!("Nothing to translate for {}", profile.name);
            report.duration = start.elapsed();
            return Ok(report);
        }

        let mut sink = Sink::prepare(self.db.clone(), profile, &columns, translatable.clone(), review_log).await?;
        let reconciler = Reconciler::new(profile.shape);
        let delay = options.inter_batch_delay.unwrap_or(self.inter_batch_delay);

        let total_batches = batch::batch_count(work.len(), batch_size);
        let progress_bar = progress_bar(total_batches as u64, options.show_progress);
        progress_bar.set_message(format!("{} -> {}", profile.source_table, profile.target_table));

        for batch in batch::chunks(&work, batch_size) {
            let request = BatchRequest::from_records(batch.records, &translatable);
            let instructions = build_instructions(
                &self.template,
                source_language,
                &self.target_language,
                profile.shape,
                &request,
            )
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;

            debug!("Batch {}/{}: {} records", batch.index + 1, batch.total, request.len());
            let call_start = Instant::now();
            let reply = self.client.translate(&instructions).await;
            report.usage.api_duration += call_start.elapsed();
            let reply = reply.inspect_err(|e| {
                progress_bar.abandon_with_message(format!("Batch {}/{} failed", batch.index + 1, batch.total));
                warn!("{}", e);
            })?;
            report.usage.add_token_usage(reply.prompt_tokens, reply.completion_tokens);

            let response = reconciler.reconcile(&request, &reply.text).inspect_err(|_| {
                progress_bar.abandon_with_message(format!("Batch {}/{} failed", batch.index + 1, batch.total));
                debug!("Unusable response: {}", reply.text);
            })?;

            let completed: Vec<CompletionRecord> = batch
                .records
                .iter()
                .zip(response.items.iter())
                .map(|(record, translated)| CompletionRecord::assemble(record, &profile.key_columns, translated))
                .collect();

            sink.commit(&completed).await.inspect_err(|_| {
                progress_bar.abandon_with_message(format!("Batch {}/{} failed", batch.index + 1, batch.total));
            })?;

            report.processed += completed.len();
            report.batches += 1;
            progress_bar.inc(1);

            if batch.index + 1 < batch.total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let written = sink.finish().await?;
        progress_bar.finish_with_message(format!("{} rows written to {}", written, profile.target_table));

        report.duration = start.elapsed();
        info!("{}", report);
        Ok(report)
    }

    /// Source columns to read, in declaration order unless the profile lists them
    async fn select_columns(&self, profile: &TableProfile) -> Result<Vec<ColumnInfo>> {
        let declared = self.source.columns(&profile.source_table).await?;

        let selected = match &profile.columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    declared.iter().find(|c| &c.name == name).cloned().ok_or_else(|| {
                        PipelineError::Schema(format!("Column {} not found in {}", name, profile.source_table))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => declared
                .into_iter()
                .filter(|c| profile.sequence_column.as_deref() != Some(c.name.as_str()))
                .collect(),
        };

        if let Some(missing) = profile.key_columns.iter().find(|k| !selected.iter().any(|c| &c.name == *k)) {
            return Err(PipelineError::Schema(format!(
                "Key column {} not found in {}",
                missing, profile.source_table
            ))
            .into());
        }

        Ok(selected)
    }
}

/// Split off records whose key is in the ledger
fn drop_completed(
    records: Vec<SourceRecord>,
    ledger: &CompletionLedger,
    key_columns: &[String],
) -> (Vec<SourceRecord>, usize) {
    if ledger.is_empty() {
        return (records, 0);
    }
    let total = records.len();
    let pending: Vec<SourceRecord> = records
        .into_iter()
        .filter(|r| !ledger.contains(&r.identity_key(key_columns)))
        .collect();
    let skipped = total - pending.len();
    (pending, skipped)
}

/// Split off records whose key already exists in the target table
fn drop_present_in_target(
    records: Vec<SourceRecord>,
    existing: &HashSet<IdentityKey>,
    key_columns: &[String],
) -> (Vec<SourceRecord>, usize) {
    let total = records.len();
    let pending: Vec<SourceRecord> = records
        .into_iter()
        .filter(|r| !existing.contains(&r.identity_key(key_columns)))
        .collect();
    let skipped = total - pending.len();
    (pending, skipped)
}

/// Apply the profile's exclusion rules, returning the survivors and the count removed
pub fn apply_exclusions(
    records: Vec<SourceRecord>,
    profile: &TableProfile,
    existing: &HashSet<IdentityKey>,
) -> (Vec<SourceRecord>, usize) {
    let total = records.len();
    let kept: Vec<SourceRecord> = records
        .into_iter()
        .filter(|record| {
            !profile.exclusions.iter().any(|rule| match rule {
                Exclusion::SkipBlank { column } => record.get(column).is_none_or(|v| v.is_blank()),
                Exclusion::SkipValue { column, value } => {
                    record.text(column).trim().to_lowercase() == value.trim().to_lowercase()
                }
                Exclusion::SkipExistingKeys => existing.contains(&record.identity_key(&profile.key_columns)),
            })
        })
        .collect();
    let excluded = total - kept.len();
    (kept, excluded)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let progress_bar = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar
}
