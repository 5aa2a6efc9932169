use super::{AppContext, ui};
use crate::core::currency::{CurrencyCode, CurrencyRateProvider, popular_currencies};
use crate::core::rate::ResolvedRate;
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;

pub struct QuoteRow {
    pub quote: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
    pub resolved: Result<ResolvedRate>,
}

/// Resolves `base` against every popular currency other than itself.
pub async fn fetch_quotes(provider: &dyn CurrencyRateProvider, base: &CurrencyCode) -> Vec<QuoteRow> {
    let futures = popular_currencies()
        .filter(|c| c.code != base.as_str())
        .map(|currency| async move {
            QuoteRow {
                quote: currency.code,
                name: currency.name,
                flag: currency.flag,
                resolved: provider.get_rate(base, currency.code).await,
            }
        });
    join_all(futures).await
}

pub fn display_quotes(base: &CurrencyCode, rows: &[QuoteRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Currency"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
    ]);

    for row in rows {
        let pair = Cell::new(format!("{}/{}", base, row.quote));
        let name = Cell::new(format!("{} {}", row.flag, row.name));
        match &row.resolved {
            Ok(resolved) => table.add_row(vec![
                pair,
                name,
                ui::number_cell(format!("{:.4}", resolved.rate)),
                ui::provenance_cell(resolved.provenance),
            ]),
            Err(e) => table.add_row(vec![
                pair,
                name,
                ui::number_cell("N/A".to_string()),
                Cell::new(ui::style_text(&e.to_string(), ui::StyleType::Error)),
            ]),
        };
    }

    format!(
        "Rates for {}\n\n{}",
        ui::style_text(base, ui::StyleType::Title),
        table
    )
}

pub async fn run(context: &AppContext, base: &CurrencyCode) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let rows = fetch_quotes(context.rates.as_ref(), base).await;
    spinner.finish_and_clear();
    println!("{}", display_quotes(base, &rows));
    Ok(())
}
