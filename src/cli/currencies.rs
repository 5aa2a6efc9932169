use super::ui;
use crate::core::currency::CurrencyInfo;
use comfy_table::Cell;

pub fn display_currencies(currencies: &[CurrencyInfo]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Currency"),
        ui::header_cell("Popular"),
    ]);
    for currency in currencies {
        table.add_row(vec![
            Cell::new(currency.code),
            Cell::new(format!("{} {}", currency.flag, currency.name)),
            Cell::new(if currency.popular { "★" } else { "" }),
        ]);
    }
    table.to_string()
}

pub fn run() {
    println!("{}", display_currencies(crate::core::currency::CURRENCIES));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CURRENCIES;

    #[test]
    fn test_display_currencies() {
        let output = display_currencies(CURRENCIES);
        for currency in CURRENCIES {
            assert!(output.contains(currency.code));
        }
        assert_eq!(output.matches('★').count(), 5);
    }
}
