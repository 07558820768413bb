use crate::domain::market::signal::{Diagnostic, SignalLabel};
use crate::domain::market::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Rendered in place of any value that could not be computed.
pub const PLACEHOLDER: &str = "-";

/// One timeframe column of a result row; `signal` is `None` when unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeframeCell {
    pub timeframe: Timeframe,
    pub signal: Option<SignalLabel>,
}

impl TimeframeCell {
    pub fn display(&self) -> String {
        self.signal
            .map(|s| s.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub symbol: String,
    pub last_price: Option<Decimal>,
    /// One cell per [`Timeframe::REPORTED`] entry, in that order
    pub cells: Vec<TimeframeCell>,
}

impl ResultRow {
    /// Row for a symbol with no usable data at all.
    pub fn placeholder(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            last_price: None,
            cells: Timeframe::REPORTED
                .iter()
                .map(|tf| TimeframeCell {
                    timeframe: *tf,
                    signal: None,
                })
                .collect(),
        }
    }

    pub fn signal(&self, timeframe: Timeframe) -> Option<SignalLabel> {
        self.cells
            .iter()
            .find(|c| c.timeframe == timeframe)
            .and_then(|c| c.signal)
    }

    pub fn price_display(&self) -> String {
        self.last_price
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTable {
    pub name: String,
    pub rows: Vec<ResultRow>,
}

/// Output of one scan cycle
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub groups: Vec<GroupTable>,
    pub updated_at: DateTime<Utc>,
    pub symbols_scanned: usize,
    pub symbols_without_data: usize,
    pub diagnostic: Option<Diagnostic>,
}

impl ScanReport {
    pub fn row(&self, group: &str, symbol: &str) -> Option<&ResultRow> {
        self.groups
            .iter()
            .find(|g| g.name == group)
            .and_then(|g| g.rows.iter().find(|r| r.symbol == symbol))
    }

    /// Plain-text table, one block per group.
    pub fn to_text(&self) -> String {
        let mut out = format!("Updated {}\n", self.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        for group in &self.groups {
            out.push_str(&format!("\n== {} ==\n", group.name));
            out.push_str(&format!("{:<8}{:>10}", "SYMBOL", "PRICE"));
            for tf in Timeframe::REPORTED {
                out.push_str(&format!("  {:<13}", tf.label()));
            }
            out.push('\n');
            for row in &group.rows {
                out.push_str(&format!("{:<8}{:>10}", row.symbol, row.price_display()));
                for cell in &row.cells {
                    out.push_str(&format!("  {:<13}", cell.display()));
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_placeholder_row() {
        let row = ResultRow::placeholder("ZZZZ");

        assert_eq!(row.cells.len(), Timeframe::REPORTED.len());
        assert!(row.cells.iter().all(|c| c.signal.is_none()));
        assert_eq!(row.price_display(), "-");
        assert_eq!(row.cells[0].display(), "-");
    }

    #[test]
    fn test_price_display_two_decimals() {
        let mut row = ResultRow::placeholder("AAPL");
        row.last_price = Some(dec!(187.5));
        assert_eq!(row.price_display(), "187.50");
    }

    #[test]
    fn test_text_rendering() {
        let mut row = ResultRow::placeholder("NVDA");
        row.cells[1].signal = Some(SignalLabel::StrongBuy);
        let report = ScanReport {
            groups: vec![GroupTable {
                name: "Chips".to_string(),
                rows: vec![row],
            }],
            updated_at: Utc::now(),
            symbols_scanned: 1,
            symbols_without_data: 0,
            diagnostic: None,
        };

        let text = report.to_text();
        assert!(text.contains("== Chips =="));
        assert!(text.contains("STRONG BUY"));
        assert_eq!(
            report.row("Chips", "NVDA").unwrap().signal(Timeframe::FifteenMin),
            Some(SignalLabel::StrongBuy)
        );
    }
}
