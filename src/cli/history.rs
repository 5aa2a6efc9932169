use super::{AppContext, ui};
use crate::core::conversion::ConversionRecord;
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub fn display_history(records: &[ConversionRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("No conversions recorded yet", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Rate"),
    ]);
    for record in records {
        let time = record.created_at.map_or("N/A".to_string(), |at| {
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
        });
        table.add_row(vec![
            Cell::new(time),
            ui::number_cell(format!("{:.2} {}", record.from_amount, record.from_currency)),
            ui::number_cell(format!("{:.2} {}", record.to_amount, record.to_currency)),
            ui::number_cell(format!("{:.4}", record.exchange_rate)),
        ]);
    }
    table.to_string()
}

pub async fn run(context: &AppContext, limit: usize) -> Result<()> {
    let session = context.require_session()?;
    let backend = context.backend()?;

    let spinner = ui::new_spinner("Loading conversion history...");
    let records = backend.history.list_conversions(&session, limit).await;
    spinner.finish_and_clear();

    println!("{}", display_history(&records?));
    Ok(())
}
