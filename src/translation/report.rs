/*!
 * Run statistics.
 */

use std::fmt;
use std::time::Duration;

/// Token usage accumulated over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Total time spent on service requests, retries included
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add the usage reported for one call
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Tokens per minute of service time
    pub fn tokens_per_minute(&self) -> f64 {
        let minutes = self.api_duration.as_secs_f64() / 60.0;
        if minutes > 0.0 { self.total_tokens as f64 / minutes } else { 0.0 }
    }
}

/// Outcome of one table run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Profile that ran
    pub profile: String,
    /// Target table
    pub target_table: String,
    /// Records read from the source
    pub source_records: usize,
    /// Records skipped because the review log already had them
    pub skipped_completed: usize,
    /// Records removed by exclusion rules
    pub skipped_excluded: usize,
    /// Records translated and committed
    pub processed: usize,
    /// Batches committed
    pub batches: usize,
    /// Whether the run stopped after the schema check
    pub dry_run: bool,
    /// Wall-clock duration
    pub duration: Duration,
    /// Token usage
    pub usage: TokenUsageStats,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            return write!(f, "Dry run for {}: schema OK, review log header written", self.profile);
        }
        write!(
            f,
            "{} -> {}: {} source, {} already done, {} excluded, {} translated in {} batches ({:.1}s, {} tokens)",
            self.profile,
            self.target_table,
            self.source_records,
            self.skipped_completed,
            self.skipped_excluded,
            self.processed,
            self.batches,
            self.duration.as_secs_f64(),
            self.usage.total_tokens
        )
    }
}
