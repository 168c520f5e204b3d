//! Field mapping helpers shared by the provider adapters.

use std::fmt;

use chrono::{DateTime, Utc};
use jobscout_core::models::{RemoteLabel, SearchParams};
use jobscout_core::util::{fold, tokens};
use serde::Deserialize;

/// Provider ids arrive as JSON strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(u64),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Text(s) => f.write_str(s),
            RawId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// `"adzuna"`, `123` -> `"adzuna-123"`.
pub fn namespaced_id(prefix: &str, raw: &RawId) -> String {
    format!("{prefix}-{raw}")
}

/// Remote label from an explicit flag and any free text the provider gives.
pub fn remote_label(flag: Option<bool>, texts: &[&str]) -> RemoteLabel {
    let words: Vec<String> = texts.iter().flat_map(|t| tokens(t)).collect();
    if words.iter().any(|w| w == "hybrid") {
        RemoteLabel::Hybrid
    } else if flag == Some(true) || words.iter().any(|w| w == "remote") {
        RemoteLabel::Remote
    } else {
        RemoteLabel::OnSite
    }
}

const SENIOR_WORDS: &[&str] = &["senior", "sr", "lead", "principal", "staff", "head", "director"];
const ENTRY_WORDS: &[&str] = &[
    "junior",
    "jr",
    "entry",
    "intern",
    "internship",
    "graduate",
    "trainee",
];

/// Experience level guessed from title keywords.
pub fn infer_experience(title: &str) -> String {
    let words = tokens(title);
    if words.iter().any(|w| SENIOR_WORDS.contains(&w.as_str())) {
        "Senior Level".to_string()
    } else if words.iter().any(|w| ENTRY_WORDS.contains(&w.as_str())) {
        "Entry Level".to_string()
    } else {
        "Mid Level".to_string()
    }
}

/// Display job type for provider spellings such as `full_time` or
/// `"full time"`.
pub fn job_type_label(raw: &str) -> String {
    let folded = fold(&raw.replace(['_', '-'], " "));
    match folded.as_str() {
        "full time" | "fulltime" | "permanent" => "Full-time".to_string(),
        "part time" | "parttime" => "Part-time".to_string(),
        "contract" | "contractor" | "freelance" => "Contract".to_string(),
        "internship" | "intern" => "Internship".to_string(),
        "temporary" | "temp" => "Temporary".to_string(),
        "" => "Not specified".to_string(),
        _ => collapse_title_case(&folded),
    }
}

fn collapse_title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower bound of a salary range such as `"50000-80000"`, `"$60k+"` or
/// `"45,000"`.
pub fn salary_floor(range: &str) -> Option<u64> {
    let lower = range.to_lowercase();
    let start = lower.find(|c: char| c.is_ascii_digit())?;
    let rest = &lower[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let digits: String = rest[..end].chars().filter(|c| *c != ',').collect();
    let value: f64 = digits.parse().ok()?;
    let value = if rest[end..].starts_with('k') {
        value * 1000.0
    } else {
        value
    };
    (value > 0.0).then_some(value.round() as u64)
}

/// `"$50,000 - $70,000"` style salary text. Zero or missing bounds are
/// treated as absent.
pub fn format_salary(min: Option<f64>, max: Option<f64>, symbol: &str) -> Option<String> {
    let fmt = |v: f64| format!("{symbol}{}", thousands(v.round() as u64));
    match (min.filter(|v| *v > 0.0), max.filter(|v| *v > 0.0)) {
        (Some(lo), Some(hi)) if (lo - hi).abs() < 0.5 => Some(fmt(lo)),
        (Some(lo), Some(hi)) => Some(format!("{} - {}", fmt(lo), fmt(hi))),
        (Some(lo), None) => Some(format!("From {}", fmt(lo))),
        (None, Some(hi)) => Some(format!("Up to {}", fmt(hi))),
        (None, None) => None,
    }
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// RFC 3339 timestamp, or `fallback` when missing or unparseable.
pub fn parse_date(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(fallback)
}

/// Client-side filter for providers without server-side search.
pub struct LocalFilter {
    query: Vec<String>,
    location: Option<String>,
    remote: Option<bool>,
}

impl LocalFilter {
    pub fn new(params: &SearchParams) -> Self {
        Self {
            query: params.query.as_deref().map(tokens).unwrap_or_default(),
            location: params.location.as_deref().map(fold).filter(|l| !l.is_empty()),
            remote: params.remote,
        }
    }

    /// Every query token must occur somewhere in `haystacks`.
    pub fn matches_query(&self, haystacks: &[&str]) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let words: Vec<String> = haystacks.iter().flat_map(|h| tokens(h)).collect();
        self.query.iter().all(|q| words.contains(q))
    }

    /// Substring match on the folded location. Remote jobs with no location
    /// or a worldwide one pass any location filter.
    pub fn matches_location(&self, location: &str, remote: RemoteLabel) -> bool {
        let Some(wanted) = &self.location else {
            return true;
        };
        let have = fold(location);
        if remote == RemoteLabel::Remote
            && (have.is_empty() || ["worldwide", "anywhere"].iter().any(|w| have.contains(w)))
        {
            return true;
        }
        have.contains(wanted.as_str())
    }

    pub fn matches_remote(&self, remote: RemoteLabel) -> bool {
        match self.remote {
            Some(true) => remote == RemoteLabel::Remote,
            Some(false) => remote != RemoteLabel::Remote,
            None => true,
        }
    }
}
