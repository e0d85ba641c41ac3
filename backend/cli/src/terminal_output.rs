//! Terminal output utilities: notes, table rendering, and the console notifier.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use courier_core::{HistoryRecord, Notifier};
use courier_scheduler::retry::shorten;

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

pub enum Align {
    Left,
    Right,
}

pub struct Column {
    pub header: String,
    pub align: Align,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left, max_width: None }
    }

    pub fn right(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right, max_width: None }
    }

    pub fn max(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Render a table; cells wider than a column's `max_width` are truncated to
/// that width, ellipsis included.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let fit = |i: usize, cell: &str| match columns[i].max_width {
        Some(max) => fit_width(cell, max),
        None => cell.to_string(),
    };
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| (0..num_cols).map(|i| fit(i, row.get(i).map(String::as_str).unwrap_or(""))).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| visible_width(&c.header)).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(visible_width(cell));
        }
    }

    let mut out = String::new();

    let header_cells: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
        .collect();
    if supports_color() {
        out.push_str(&format!("{BOLD}  {}  {RESET}\n", header_cells.join("  ")));
    } else {
        out.push_str(&format!("  {}  \n", header_cells.join("  ")));
    }

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad_cell(cell, widths[i], &columns[i].align))
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }

    out
}

const ELLIPSIS_WIDTH: usize = 3;

fn fit_width(cell: &str, max: usize) -> String {
    if visible_width(cell) <= max {
        return cell.to_string();
    }
    if max < ELLIPSIS_WIDTH {
        return cell.chars().take(max).collect();
    }
    shorten(cell, max - ELLIPSIS_WIDTH)
}

fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = width.saturating_sub(visible_width(s));
    match align {
        Align::Left => format!("{s}{}", " ".repeat(pad)),
        Align::Right => format!("{}{s}", " ".repeat(pad)),
    }
}

/// Write a chunk and flush immediately.
pub fn stream_write(writer: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

// ---------------------------------------------------------------------------
// History listing
// ---------------------------------------------------------------------------

pub fn render_history(records: &[HistoryRecord]) -> String {
    let columns = [
        Column::right("#"),
        Column::left("Time"),
        Column::left("Status"),
        Column::left("Patient").max(24),
        Column::left("Visit"),
        Column::left("Age"),
        Column::left("Response").max(48),
    ];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            let details = r.details.clone().unwrap_or_default();
            let status = if !supports_color() {
                r.status.clone()
            } else if r.is_error() {
                format!("{RED}{}{RESET}", r.status)
            } else {
                format!("{GREEN}{}{RESET}", r.status)
            };
            vec![
                r.id.to_string(),
                r.timestamp.clone(),
                status,
                details.patient_name.clone().unwrap_or_else(|| "-".into()),
                details.visit_date.clone().unwrap_or_else(|| "-".into()),
                details.age_label().unwrap_or_else(|| "-".into()),
                r.response_body.clone(),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

// ---------------------------------------------------------------------------
// Console notifier
// ---------------------------------------------------------------------------

/// Shows notices on the terminal. Ongoing notices rewrite a single line.
#[derive(Default)]
pub struct ConsoleNotifier {
    ongoing_line: AtomicBool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, _id: u32, title: &str, body: &str, ongoing: bool) -> Result<()> {
        let mut stdout = std::io::stdout();
        if ongoing {
            let line = if supports_color() {
                format!("\r{DIM}{title}:{RESET} {body}   ")
            } else {
                format!("\r{title}: {body}   ")
            };
            stream_write(&mut stdout, &line)?;
            self.ongoing_line.store(true, Ordering::Relaxed);
            return Ok(());
        }

        if self.ongoing_line.swap(false, Ordering::Relaxed) {
            stream_write(&mut stdout, "\n")?;
        }
        let msg = format!("{title}: {body}");
        match title {
            "Appointment success" => note_success(&msg),
            "Appointment failed" => note_warn(&msg),
            "Appointment failure" => note_error(&msg),
            _ => note_info(&msg),
        }
        Ok(())
    }
}
