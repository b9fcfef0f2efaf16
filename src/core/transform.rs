use crate::domain::model::{Conversion, EnrichedRecord, ExchangeRateTable, Record, Table};
use crate::utils::error::{EtlError, Result};

/// Rounds half away from zero at the given number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn currency_column(currency: &str) -> String {
    format!("MC_{}_Billion", currency)
}

/// Accepts `1,234.5`-style tokens; anything else non-numeric is a parse error.
pub fn parse_market_cap(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerces the raw USD values to whole billions and adds one converted column per
/// currency. All rates are resolved before any row is touched, and the input
/// table is only borrowed, so a failure leaves it exactly as it was.
pub fn transform(
    table: &Table<Record>,
    rates: &ExchangeRateTable,
    currencies: &[String],
) -> Result<Table<EnrichedRecord>> {
    let resolved: Vec<(&String, f64)> = currencies
        .iter()
        .map(|currency| {
            rates
                .rate(currency)
                .map(|rate| (currency, rate))
                .ok_or_else(|| EtlError::MissingRateError {
                    currency: currency.clone(),
                })
        })
        .collect::<Result<_>>()?;

    let mut columns = table.columns().to_vec();
    columns.extend(currencies.iter().map(|c| currency_column(c)));

    let mut enriched = Table::new(columns);
    for (index, record) in table.iter().enumerate() {
        let usd = parse_market_cap(&record.market_cap_usd).ok_or_else(|| {
            EtlError::parse(format!(
                "Row {} ({}): cannot convert '{}' to a number",
                index + 1,
                record.name,
                record.market_cap_usd
            ))
        })?;
        let usd = round_to(usd, 0);

        let conversions = resolved
            .iter()
            .map(|(currency, rate)| Conversion {
                currency: (*currency).clone(),
                value: round_to(usd * rate, 2),
            })
            .collect();

        enriched.push(EnrichedRecord::new(record.name.clone(), usd, conversions));
    }

    tracing::debug!(
        "Converted {} records into {} currencies",
        enriched.len(),
        currencies.len()
    );
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> ExchangeRateTable {
        [("EUR", 0.93), ("GBP", 0.8), ("INR", 82.95)]
            .into_iter()
            .map(|(c, r)| (c.to_string(), r))
            .collect()
    }

    fn currencies() -> Vec<String> {
        vec!["EUR".to_string(), "GBP".to_string(), "INR".to_string()]
    }

    fn table(values: &[(&str, &str)]) -> Table<Record> {
        let mut table = Table::new(vec!["Name".to_string(), "MC_USD_Billion".to_string()]);
        for (name, value) in values {
            table.push(Record {
                name: name.to_string(),
                market_cap_usd: value.to_string(),
            });
        }
        table
    }

    #[test]
    fn test_worked_example() {
        let input = table(&[("JPMorgan Chase", "432.92")]);
        let output = transform(&input, &rates(), &currencies()).unwrap();

        let row = &output.rows()[0];
        assert_eq!(row.name(), "JPMorgan Chase");
        assert_eq!(row.market_cap_usd(), 433.0);
        assert_eq!(row.converted("EUR"), Some(402.69));
        assert_eq!(row.converted("GBP"), Some(346.4));
        assert_eq!(row.converted("INR"), Some(35917.35));
    }

    #[test]
    fn test_reference_rows() {
        let input = table(&[
            ("Bank of America", "231.52"),
            ("Industrial and Commercial Bank of China", "194.56"),
            ("HDFC Bank", "157.91"),
        ]);
        let output = transform(&input, &rates(), &currencies()).unwrap();

        let expected = [
            (232.0, 215.76, 185.6, 19244.4),
            (195.0, 181.35, 156.0, 16175.25),
            (158.0, 146.94, 126.4, 13106.1),
        ];
        for (row, (usd, eur, gbp, inr)) in output.iter().zip(expected) {
            assert_eq!(row.market_cap_usd(), usd);
            assert_eq!(row.converted("EUR"), Some(eur));
            assert_eq!(row.converted("GBP"), Some(gbp));
            assert_eq!(row.converted("INR"), Some(inr));
        }
    }

    #[test]
    fn test_column_order() {
        let output = transform(&table(&[("A", "1")]), &rates(), &currencies()).unwrap();
        assert_eq!(
            output.columns(),
            &[
                "Name",
                "MC_USD_Billion",
                "MC_EUR_Billion",
                "MC_GBP_Billion",
                "MC_INR_Billion"
            ]
        );
    }

    #[test]
    fn test_missing_rate_leaves_input_untouched() {
        let input = table(&[("A", "10.4")]);
        let before = input.clone();
        let partial: ExchangeRateTable = [("EUR".to_string(), 0.93), ("INR".to_string(), 82.95)]
            .into_iter()
            .collect();

        let result = transform(&input, &partial, &currencies());

        match result {
            Err(EtlError::MissingRateError { currency }) => assert_eq!(currency, "GBP"),
            other => panic!("expected MissingRateError, got {:?}", other),
        }
        assert_eq!(input, before);
    }

    #[test]
    fn test_unparseable_value_is_parse_error() {
        let input = table(&[("A", "10"), ("B", "n/a")]);
        let result = transform(&input, &rates(), &currencies());
        assert!(matches!(result, Err(EtlError::ParseError { .. })));
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(3.5, 0), 4.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1.234, 2), 1.23);
    }

    #[test]
    fn test_parse_market_cap() {
        assert_eq!(parse_market_cap(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_market_cap("432.92"), Some(432.92));
        assert_eq!(parse_market_cap(""), None);
        assert_eq!(parse_market_cap("NaN"), None);
    }

    #[test]
    fn test_only_configured_currencies() {
        let gbp_only = vec!["GBP".to_string()];
        let output = transform(&table(&[("A", "100")]), &rates(), &gbp_only).unwrap();

        assert_eq!(output.columns().len(), 3);
        assert_eq!(output.rows()[0].converted("GBP"), Some(80.0));
        assert_eq!(output.rows()[0].converted("EUR"), None);
    }
}
