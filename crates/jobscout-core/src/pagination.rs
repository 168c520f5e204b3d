use std::collections::HashSet;

use serde::Serialize;

use crate::models::{AggregationResult, NormalizedJob, USER_SUBMITTED_SOURCE};

/// One page of a merged list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Length of the full list.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

/// Slice `items` to the 1-indexed `page` of size `limit`.
///
/// Out-of-range pages yield an empty slice; `total` always reports the full
/// count. Page 0 is treated as page 1.
pub fn paginate<T>(items: &[T], page: usize, limit: usize) -> Page<'_, T> {
    let page = page.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };

    Page {
        items: &items[start..end],
        total,
        page,
        limit,
        total_pages,
        has_more: end < total,
    }
}

/// Append user-submitted postings after the provider results.
///
/// Postings whose id is already present are dropped so ids stay unique.
/// `sources` gains [`USER_SUBMITTED_SOURCE`] when anything was appended.
pub fn with_user_submitted(
    mut result: AggregationResult,
    user_jobs: Vec<NormalizedJob>,
) -> AggregationResult {
    let mut seen: HashSet<String> = result.jobs.iter().map(|j| j.id.clone()).collect();
    let before = result.jobs.len();
    result
        .jobs
        .extend(user_jobs.into_iter().filter(|j| seen.insert(j.id.clone())));

    if result.jobs.len() > before && !result.sources.iter().any(|s| s == USER_SUBMITTED_SOURCE) {
        result.sources.push(USER_SUBMITTED_SOURCE.to_string());
    }
    result.total = result.jobs.len();
    result
}
