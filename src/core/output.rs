//! Plain-text rendering for the terminal: bounded cells and aligned tables.

use colored::Colorize;

/// Widest a single table cell may grow before it is cut with `...`.
pub const MAX_CELL_CHARS: usize = 40;

/// Fold runs of whitespace into single spaces and cut at `max_chars`.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let words: Vec<&str> = input.split_whitespace().collect();
    let single = words.join(" ");
    match single.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &single[..cut]),
        None => single,
    }
}

/// Render rows under a header as left-aligned, pipe-separated columns.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| compact_line(c, MAX_CELL_CHARS)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let pad = |text: &str, width: usize| {
        let fill = width.saturating_sub(text.chars().count());
        format!("{}{}", text, " ".repeat(fill))
    };

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect::<Vec<_>>()
        .join(" | ");
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut out = String::new();
    out.push_str(&header_line.bold().to_string());
    out.push('\n');
    out.push_str(&rule);
    for row in &cells {
        out.push('\n');
        let line = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(line.trim_end());
    }
    out
}
