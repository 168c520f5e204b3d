//! Merge, dedupe, tag and sort provider results.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use crate::models::{NormalizedJob, SearchParams};
use crate::util::{fold, tokens};

/// Which of two duplicates to keep: `Less` means `a` wins.
///
/// Lower source priority first, then the most recent posting. Source name and
/// id settle anything left so the outcome never depends on arrival order.
fn preference(a: &NormalizedJob, b: &NormalizedJob) -> Ordering {
    a.source
        .priority
        .cmp(&b.source.priority)
        .then_with(|| b.date_posted.cmp(&a.date_posted))
        .then_with(|| a.source.name.cmp(&b.source.name))
        .then_with(|| a.id.cmp(&b.id))
}

fn keep_preferred<K, F>(jobs: Vec<NormalizedJob>, key: F) -> Vec<NormalizedJob>
where
    K: Eq + Hash,
    F: Fn(&NormalizedJob) -> K,
{
    let mut best: HashMap<K, NormalizedJob> = HashMap::with_capacity(jobs.len());
    for job in jobs {
        match best.entry(key(&job)) {
            Entry::Occupied(mut slot) => {
                if preference(&job, slot.get()) == Ordering::Less {
                    slot.insert(job);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(job);
            }
        }
    }
    best.into_values().collect()
}

/// Drop duplicates sharing a normalized (title, company, location) triple,
/// then any remaining id collisions, keeping the preferred job each time.
///
/// Output order is unspecified; call [`sort_jobs`] afterwards.
pub fn dedupe(jobs: Vec<NormalizedJob>) -> Vec<NormalizedJob> {
    let by_content = keep_preferred(jobs, NormalizedJob::dedup_key);
    keep_preferred(by_content, |job| job.id.clone())
}

/// Final ordering: recommended first, newest first, preferred source first,
/// then id.
pub fn sort_jobs(jobs: &mut [NormalizedJob]) {
    jobs.sort_by(|a, b| {
        b.is_ai_recommended
            .cmp(&a.is_ai_recommended)
            .then_with(|| b.date_posted.cmp(&a.date_posted))
            .then_with(|| a.source.priority.cmp(&b.source.priority))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Flag jobs that match the query closely.
///
/// A job already flagged by its provider stays flagged. Otherwise it is
/// flagged when every query token occurs in its title and, if an experience
/// level was requested, its experience matches.
pub fn tag_recommended(jobs: &mut [NormalizedJob], params: &SearchParams) {
    let query_tokens = params.query.as_deref().map(tokens).unwrap_or_default();
    if query_tokens.is_empty() {
        return;
    }
    let level = params.experience_level.as_deref().map(fold);

    for job in jobs.iter_mut().filter(|j| !j.is_ai_recommended) {
        let title_tokens = tokens(&job.title);
        let title_matches = query_tokens.iter().all(|t| title_tokens.contains(t));
        let level_matches = level
            .as_deref()
            .is_none_or(|l| fold(&job.experience).contains(l));
        job.is_ai_recommended = title_matches && level_matches;
    }
}

/// Full pipeline from concatenated provider output to the final list.
pub fn merge(jobs: Vec<NormalizedJob>, params: &SearchParams) -> Vec<NormalizedJob> {
    let mut jobs = dedupe(jobs);
    tag_recommended(&mut jobs, params);
    sort_jobs(&mut jobs);
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{days_ago, make_job};
    use std::collections::HashSet;

    #[test]
    fn duplicate_from_lower_priority_source_is_dropped() {
        let j1 = make_job("J1", "Rust Engineer", "Acme", "Berlin", "Indeed", 1);
        let j2 = make_job("J2", "rust  engineer", "ACME", " berlin", "Other", 2);
        let j3 = make_job("J3", "Go Developer", "Initech", "Remote", "Indeed", 1);

        let merged = merge(vec![j2, j3, j1], &SearchParams::default());
        let ids: Vec<_> = merged.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["J1", "J3"]);
    }

    #[test]
    fn equal_priority_duplicates_keep_most_recent() {
        let mut old = make_job("old", "Rust Engineer", "Acme", "Berlin", "A", 1);
        old.date_posted = days_ago(5);
        let mut new = make_job("new", "Rust Engineer", "Acme", "Berlin", "B", 1);
        new.date_posted = days_ago(1);

        let merged = dedupe(vec![old, new]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "new");
    }

    #[test]
    fn id_collisions_across_sources_are_resolved() {
        let a = make_job("42", "Rust Engineer", "Acme", "Berlin", "A", 1);
        let b = make_job("42", "Designer", "Globex", "Paris", "B", 2);

        let merged = dedupe(vec![b, a]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source.name, "A");
    }

    #[test]
    fn no_duplicate_triples_survive() {
        let mut jobs = Vec::new();
        for i in 0..30 {
            let title = if i % 3 == 0 { "Rust Engineer" } else { "RUST ENGINEER " };
            let mut job = make_job(&format!("id{i}"), title, "Acme", "Berlin", "S", i % 4);
            job.date_posted = days_ago(i as i64 % 7);
            jobs.push(job);
        }
        jobs.push(make_job("u", "Unique", "Acme", "Berlin", "S", 0));

        let merged = merge(jobs, &SearchParams::default());
        let keys: HashSet<_> = merged.iter().map(NormalizedJob::dedup_key).collect();
        assert_eq!(keys.len(), merged.len());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn sort_order_is_deterministic() {
        let mut a = make_job("b", "A", "X", "L", "S1", 2);
        a.date_posted = days_ago(1);
        let mut b = make_job("a", "B", "X", "L", "S2", 1);
        b.date_posted = days_ago(1);
        let mut c = make_job("c", "C", "X", "L", "S1", 1);
        c.date_posted = days_ago(0);
        let mut d = make_job("d", "D", "X", "L", "S1", 3);
        d.date_posted = days_ago(9);
        d.is_ai_recommended = true;
        let mut e = make_job("e", "E", "X", "L", "S1", 2);
        e.date_posted = a.date_posted;

        let mut jobs = vec![a, b, c, d, e];
        sort_jobs(&mut jobs);
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        // recommended, newest, then same date by priority, then by id
        assert_eq!(ids, vec!["d", "c", "a", "b", "e"]);
    }

    #[test]
    fn recommendation_requires_all_query_tokens_in_title() {
        let mut jobs = vec![
            make_job("1", "Senior Rust Engineer", "Acme", "Berlin", "S", 1),
            make_job("2", "Rust Developer", "Acme", "Berlin", "S", 1),
        ];
        tag_recommended(&mut jobs, &SearchParams::default().with_query("rust engineer"));
        assert!(jobs[0].is_ai_recommended);
        assert!(!jobs[1].is_ai_recommended);
    }

    #[test]
    fn recommendation_respects_experience_level() {
        let mut senior = make_job("1", "Rust Engineer", "Acme", "Berlin", "S", 1);
        senior.experience = "Senior".into();
        let mut junior = make_job("2", "Rust Engineer II", "Acme", "Munich", "S", 1);
        junior.experience = "Entry Level".into();
        let mut jobs = vec![senior, junior];

        let params = SearchParams {
            experience_level: Some("senior".into()),
            ..SearchParams::default().with_query("rust engineer")
        };
        tag_recommended(&mut jobs, &params);
        assert!(jobs[0].is_ai_recommended);
        assert!(!jobs[1].is_ai_recommended);
    }

    #[test]
    fn provider_flag_is_preserved_without_query() {
        let mut job = make_job("1", "Anything", "Acme", "Berlin", "S", 1);
        job.is_ai_recommended = true;
        let mut jobs = vec![job];
        tag_recommended(&mut jobs, &SearchParams::default());
        assert!(jobs[0].is_ai_recommended);
    }
}
