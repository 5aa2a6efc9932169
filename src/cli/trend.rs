use super::{AppContext, ui};
use crate::core::currency::CurrencyCode;
use crate::core::trend::{TrendPoint, generate_trend, trend_range};
use anyhow::{Result, bail};
use chrono::Local;

const BAR_WIDTH: usize = 30;
const MAX_TREND_DAYS: u32 = 365;

pub fn display_trend(from: &CurrencyCode, to: &CurrencyCode, points: &[TrendPoint]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Rate"),
        ui::header_cell("Trend"),
    ]);

    let (low, high) = trend_range(points).unwrap_or((0.0, 0.0));
    for point in points {
        table.add_row(vec![
            comfy_table::Cell::new(point.date.format("%m-%d").to_string()),
            ui::number_cell(format!("{:.4}", point.rate)),
            comfy_table::Cell::new(ui::render_bar(point.rate, low, high, BAR_WIDTH))
                .fg(comfy_table::Color::Cyan),
        ]);
    }

    let mut output = format!(
        "{}-day trend for {}\n\n{}",
        points.len(),
        ui::style_text(&format!("{from}/{to}"), ui::StyleType::Title),
        table
    );
    if !points.is_empty() {
        output.push_str(&format!(
            "\n\n{} {:.4}  {} {:.4}",
            ui::style_text("Low", ui::StyleType::TotalLabel),
            low,
            ui::style_text("High", ui::StyleType::TotalLabel),
            high
        ));
    }
    output
}

pub async fn run(
    context: &AppContext,
    from: &CurrencyCode,
    to: &CurrencyCode,
    days: u32,
) -> Result<()> {
    if days == 0 || days > MAX_TREND_DAYS {
        bail!("Trend length must be between 1 and {MAX_TREND_DAYS} days, got {days}");
    }
    let spinner = ui::new_spinner("Loading rate history...");
    let resolved = context.rates.get_rate(from, to).await;
    spinner.finish_and_clear();
    let resolved = resolved?;

    let today = Local::now().date_naive();
    let points = generate_trend(resolved.rate, days, today, &mut rand::thread_rng());
    println!("{}", display_trend(from, to, &points));
    Ok(())
}
