use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::rate::Provenance;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Colors a provenance tag: bridged rates are the least trustworthy.
pub fn provenance_cell(provenance: Provenance) -> Cell {
    let color = match provenance {
        Provenance::Local => Color::DarkGrey,
        Provenance::Table => Color::Green,
        Provenance::Bridged => Color::Yellow,
    };
    Cell::new(provenance.to_string()).fg(color)
}

/// A spinner shown while waiting on a lookup.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Horizontal bar proportional to where `value` sits in `[low, high]`.
pub fn render_bar(value: f64, low: f64, high: f64, width: usize) -> String {
    let span = high - low;
    let fraction = if span > 0.0 {
        ((value - low) / span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    // Keep at least one block so the smallest value is still visible
    let filled = ((fraction * (width.saturating_sub(1)) as f64).round() as usize + 1).min(width);
    "█".repeat(filled)
}

/// Reads a password from the terminal without echoing it.
pub fn prompt_password(prompt: &str) -> Result<String> {
    let term = Term::stderr();
    term.write_str(prompt)
        .context("Failed to write password prompt")?;
    term.read_secure_line().context("Failed to read password")
}
