//! Summary parsing: backend text blob → ordered [`AttendanceRow`]s.
//!
//! The backend reports one line per time period, e.g.
//!
//! ```text
//! Hour 1: 3 heads detected
//! Hour 2: 12 heads detected
//! ```
//!
//! Other deployments phrase it as `9 AM: Present 12`. Both put the label
//! before the first `:` and the headcount somewhere after it, so the parser
//! takes the first whitespace-separated token after the `:` that starts with
//! an integer.
//!
//! Blank lines are dropped, and the output keeps input order.

use crate::config::MalformedLinePolicy;
use crate::error::GintiError;
use crate::model::AttendanceRow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static RE_LEADING_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+").unwrap());

/// Parse a summary keeping malformed lines as `count = None`.
///
/// Never fails; an absent or empty summary yields no rows.
pub fn parse_summary(summary: Option<&str>) -> Vec<AttendanceRow> {
    parse_lines(summary)
        .map(|(_, _, row)| row)
        .collect()
}

/// Parse a summary and apply `policy` to lines without a count.
pub fn parse_summary_with(
    summary: Option<&str>,
    policy: MalformedLinePolicy,
) -> Result<Vec<AttendanceRow>, GintiError> {
    let mut rows = Vec::new();
    for (line_no, raw, mut row) in parse_lines(summary) {
        if row.count.is_none() {
            match policy {
                MalformedLinePolicy::Keep => {}
                MalformedLinePolicy::Skip => continue,
                MalformedLinePolicy::Zero => row.count = Some(0),
                MalformedLinePolicy::Reject => {
                    return Err(GintiError::MalformedSummary {
                        line: line_no,
                        content: raw.to_string(),
                    })
                }
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Yields `(1-based line number, raw line, row)` for every non-blank line.
fn parse_lines(summary: Option<&str>) -> impl Iterator<Item = (usize, &str, AttendanceRow)> {
    summary
        .unwrap_or_default()
        .split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| (n, line, parse_line(line)))
}

/// Parse one non-blank line.
pub fn parse_line(line: &str) -> AttendanceRow {
    let (label, rest) = line.split_once(':').unwrap_or((line, ""));
    let count = rest.split_whitespace().find_map(leading_int);
    AttendanceRow::new(label.trim(), count)
}

/// Lenient integer parse: optional sign and digits, trailing junk ignored.
fn leading_int(token: &str) -> Option<i64> {
    RE_LEADING_INT
        .find(token)
        .and_then(|m| m.as_str().parse().ok())
}

/// Aggregate figures over the rows that have a count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTotals {
    /// Number of rows, counted or not.
    pub periods: usize,
    /// Highest count and its label; the first one wins on ties.
    pub peak: Option<(String, i64)>,
    /// Mean count over counted rows.
    pub average: Option<f64>,
}

pub fn totals(rows: &[AttendanceRow]) -> SummaryTotals {
    let counted: Vec<(&str, i64)> = rows
        .iter()
        .filter_map(|r| r.count.map(|c| (r.hour.as_str(), c)))
        .collect();

    let peak = counted
        .iter()
        .fold(None::<(&str, i64)>, |best, &(h, c)| match best {
            Some((_, b)) if b >= c => best,
            _ => Some((h, c)),
        })
        .map(|(h, c)| (h.to_string(), c));

    let average = if counted.is_empty() {
        None
    } else {
        Some(counted.iter().map(|&(_, c)| c as f64).sum::<f64>() / counted.len() as f64)
    };

    SummaryTotals {
        periods: rows.len(),
        peak,
        average,
    }
}
