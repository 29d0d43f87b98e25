//! Output formatting for CLI results.

pub mod detail;
pub mod table;

pub use detail::{format_rate_report, format_simulation};
pub use table::{format_accounts_table, format_curve_table, format_steps_table};

fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}
