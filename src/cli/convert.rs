use super::{AppContext, ui};
use crate::core::conversion::{ConversionRecord, ConversionStore, convert_amount, validate_amount};
use crate::core::currency::{CurrencyCode, CurrencyRateProvider, find_currency};
use crate::core::rate::ResolvedRate;
use crate::core::session::Session;
use anyhow::{Result, bail};
use chrono::Local;
use comfy_table::Cell;
use tracing::{debug, warn};

/// Outcome of converting an amount between two currencies.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: f64,
    pub converted: f64,
    pub resolved: ResolvedRate,
}

impl Conversion {
    pub fn to_record(&self, user_id: &str) -> ConversionRecord {
        ConversionRecord {
            id: None,
            user_id: user_id.to_string(),
            from_currency: self.from.to_string(),
            to_currency: self.to.to_string(),
            from_amount: self.amount,
            to_amount: self.converted,
            exchange_rate: self.resolved.rate,
            created_at: None,
        }
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Amount"),
        ]);
        for (code, value) in [(&self.from, self.amount), (&self.to, self.converted)] {
            let label = match find_currency(code) {
                Some(info) => format!("{} {} ({})", info.flag, code, info.name),
                None => code.to_string(),
            };
            table.add_row(vec![Cell::new(label), ui::number_cell(format!("{value:.2}"))]);
        }

        let mut output = table.to_string();
        output.push_str(&format!(
            "\n\n1 {} = {} {}",
            self.from,
            ui::style_text(&format!("{:.4}", self.resolved.rate), ui::StyleType::TotalValue),
            self.to
        ));
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Updated {} · {} rate",
                    self.resolved.observed_at.with_timezone(&Local).format("%H:%M:%S"),
                    self.resolved.provenance
                ),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}

pub async fn convert(
    provider: &dyn CurrencyRateProvider,
    amount: f64,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<Conversion> {
    let amount = validate_amount(amount)?;
    let resolved = provider.get_rate(from, to).await?;
    let converted = convert_amount(amount, resolved.rate);
    if !converted.is_finite() {
        bail!("Converted amount is out of range: {amount} {from} at {}", resolved.rate);
    }
    debug!("Converted {amount} {from} to {converted} {to} at {}", resolved.rate);
    Ok(Conversion {
        from: from.clone(),
        to: to.clone(),
        amount,
        converted,
        resolved,
    })
}

/// Stores the conversion for the signed-in user. Failures are logged only.
pub async fn record(store: &dyn ConversionStore, session: &Session, conversion: &Conversion) -> bool {
    let record = conversion.to_record(&session.user.id);
    match store.insert_conversion(session, &record).await {
        Ok(()) => {
            debug!("Recorded conversion for user {}", session.user.id);
            true
        }
        Err(e) => {
            warn!("Failed to save conversion history: {e}");
            false
        }
    }
}

pub async fn run(
    context: &AppContext,
    amount: f64,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rate...");
    let conversion = convert(context.rates.as_ref(), amount, from, to).await;
    spinner.finish_and_clear();
    let conversion = conversion?;

    println!("{}", conversion.display_as_table());

    if let (Some(backend), Some(session)) = (context.backend.as_ref(), context.current_session()) {
        record(backend.history.as_ref(), &session, &conversion).await;
    }
    Ok(())
}
