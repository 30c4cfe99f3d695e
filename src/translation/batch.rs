/*!
 * Batching of the work list.
 */

use super::record::SourceRecord;

/// Clamp a requested batch size to at least 1
pub fn clamp_batch_size(requested: i64) -> usize {
    usize::try_from(requested).ok().filter(|s| *s > 0).unwrap_or(1)
}

/// Number of batches needed for `len` records
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}

/// One group of records for a single service call
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Zero-based position of the batch
    pub index: usize,
    /// Total number of batches in the run
    pub total: usize,
    /// Records in source order
    pub records: &'a [SourceRecord],
}

/// Lazily partition records into ordered groups of at most `size`.
///
/// Every record appears exactly once, in input order; only the last group
/// may be shorter. A zero size behaves as 1.
pub fn chunks(records: &[SourceRecord], size: usize) -> impl Iterator<Item = Batch<'_>> {
    let size = size.max(1);
    let total = batch_count(records.len(), size);
    records
        .chunks(size)
        .enumerate()
        .map(move |(index, records)| Batch { index, total, records })
}
