//! Terminal rendering of attendance rows.
//!
//! The table mirrors the web form's: a bordered grid with a "Time Period"
//! and a "Students Present" column, every cell centred, and `NaN` where a
//! summary line carried no count.

use crate::model::{AttendanceResult, AttendanceRow};
use crate::summary::SummaryTotals;
use std::fmt::Write as _;
use unicode_width::UnicodeWidthStr;

pub const HOUR_HEADER: &str = "Time Period";
pub const COUNT_HEADER: &str = "Students Present";

/// Border characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// `+`, `-` and `|` only.
    Ascii,
    /// Box-drawing characters. (default)
    #[default]
    Unicode,
}

struct Glyphs {
    h: char,
    v: char,
    // [left, middle, right] for top, separator and bottom rules
    top: [char; 3],
    mid: [char; 3],
    bottom: [char; 3],
}

impl TableStyle {
    fn glyphs(self) -> Glyphs {
        match self {
            TableStyle::Ascii => Glyphs {
                h: '-',
                v: '|',
                top: ['+', '+', '+'],
                mid: ['+', '+', '+'],
                bottom: ['+', '+', '+'],
            },
            TableStyle::Unicode => Glyphs {
                h: '─',
                v: '│',
                top: ['┌', '┬', '┐'],
                mid: ['├', '┼', '┤'],
                bottom: ['└', '┴', '┘'],
            },
        }
    }
}

/// Render rows as a two-column table.
pub fn render_table(rows: &[AttendanceRow], style: TableStyle) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| vec![r.hour.clone(), r.count_display()])
        .collect();
    draw(&[HOUR_HEADER, COUNT_HEADER], &cells, style)
}

/// Render a full result: the message line, then the table.
///
/// When the result references preview images the table gains a leading
/// row-number column and a trailing "Preview" column marking rows that have
/// one, so the user knows which row number to ask for.
pub fn render_report(result: &AttendanceResult, rows: &[AttendanceRow], style: TableStyle) -> String {
    let mut out = String::new();
    if !result.message.is_empty() {
        let _ = writeln!(out, "{}", result.message);
        out.push('\n');
    }

    if !result.has_images() {
        out.push_str(&render_table(rows, style));
        return out;
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let marker = if result.image_for(r).is_some() { "*" } else { "" };
            vec![
                (i + 1).to_string(),
                r.hour.clone(),
                r.count_display(),
                marker.to_string(),
            ]
        })
        .collect();
    out.push_str(&draw(&["#", HOUR_HEADER, COUNT_HEADER, "Preview"], &cells, style));
    out
}

/// One-line digest of [`SummaryTotals`].
pub fn render_totals(totals: &SummaryTotals) -> String {
    let mut parts = vec![format!("{} periods", totals.periods)];
    if let Some((hour, count)) = &totals.peak {
        parts.push(format!("peak {count} at {hour}"));
    }
    if let Some(avg) = totals.average {
        parts.push(format!("average {avg:.1}"));
    }
    parts.join(", ")
}

fn draw(headers: &[&str], rows: &[Vec<String>], style: TableStyle) -> String {
    let g = style.glyphs();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| UnicodeWidthStr::width(c.as_str()))
                .chain(std::iter::once(UnicodeWidthStr::width(*h)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = |[l, m, r]: [char; 3]| {
        let mut s = String::new();
        s.push(l);
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                s.push(m);
            }
            s.extend(std::iter::repeat(g.h).take(w + 2));
        }
        s.push(r);
        s.push('\n');
        s
    };
    let line = |cells: &[&str]| {
        let mut s = String::new();
        s.push(g.v);
        for (w, c) in widths.iter().zip(cells) {
            // centred by display width; odd padding goes to the right
            let pad = w.saturating_sub(UnicodeWidthStr::width(*c));
            let left = pad / 2;
            let _ = write!(s, " {:left$}{c}{:right$} {}", "", "", g.v, right = pad - left);
        }
        s.push('\n');
        s
    };

    let mut out = rule(g.top);
    out.push_str(&line(headers));
    out.push_str(&rule(g.mid));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&line(&cells));
    }
    out.push_str(&rule(g.bottom));
    out
}
