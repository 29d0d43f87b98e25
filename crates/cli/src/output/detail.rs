//! Detailed output formatting for rate reports and simulation results.

use colored::Colorize;

use super::{format_accounts_table, format_percent, format_steps_table};
use crate::commands::RateReport;
use crate::scenario::SimulationReport;

pub fn format_rate_report(report: &RateReport, symbol: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", "=".repeat(60)));
    output.push_str(&format!("{}\n", format!("{} Rates", symbol).bold()));
    output.push_str(&format!("{}\n\n", "=".repeat(60)));

    output.push_str(&format!("{}\n", "Balances".cyan().bold()));
    output.push_str(&format!("  Cash:           {}\n", report.cash));
    output.push_str(&format!("  Borrows:        {}\n", report.borrows));
    output.push_str(&format!("  Reserves:       {}\n", report.reserves));
    output.push_str(&format!("  Utilization:    {}\n", format_percent(report.utilization)));
    output.push_str(&format!("  Kink:           {}\n\n", format_percent(report.kink)));

    output.push_str(&format!("{}\n", "Rates".cyan().bold()));
    output.push_str(&format!(
        "  Borrow:         {} per block ({} APY)\n",
        report.borrow_rate_per_block,
        format_percent(report.borrow_apy)
    ));
    output.push_str(&format!(
        "  Supply:         {} per block ({} APY)\n",
        report.supply_rate_per_block,
        format_percent(report.supply_apy)
    ));
    output.push_str(&format!(
        "  Reserve Factor: {}\n",
        format_percent(report.reserve_factor)
    ));

    output
}

pub fn format_simulation(report: &SimulationReport) -> String {
    let market = &report.market;
    let mut output = String::new();

    output.push_str(&format!("{}\n", "=".repeat(60)));
    output.push_str(&format!(
        "{}\n",
        format!("{} ({})", market.name, market.symbol).bold()
    ));
    output.push_str(&format!("{}\n\n", "=".repeat(60)));

    output.push_str(&format!("{}\n", "Steps".cyan().bold()));
    output.push_str(&format_steps_table(&report.steps));
    output.push_str("\n\n");

    output.push_str(&format!("{}\n", "Market State".cyan().bold()));
    output.push_str(&format!("  Block:          {}\n", market.block));
    output.push_str(&format!("  Last Accrual:   {}\n", market.accrual_block_number));
    output.push_str(&format!("  Total Cash:     {}\n", market.total_cash));
    output.push_str(&format!("  Total Borrows:  {}\n", market.total_borrows));
    output.push_str(&format!("  Total Reserves: {}\n", market.total_reserves));
    output.push_str(&format!("  Total Supply:   {}\n", market.total_supply));
    output.push_str(&format!("  Borrow Index:   {}\n", market.borrow_index));
    output.push_str(&format!("  Exchange Rate:  {}\n", market.exchange_rate));
    output.push_str(&format!("  Utilization:    {}\n", format_percent(market.utilization)));
    output.push_str(&format!("  Borrow APY:     {}\n", format_percent(market.borrow_apy)));
    output.push_str(&format!("  Supply APY:     {}\n\n", format_percent(market.supply_apy)));

    output.push_str(&format!("{}\n", "Accounts".cyan().bold()));
    output.push_str(&format_accounts_table(&report.accounts));
    output.push_str("\n\n");

    output.push_str(&format!("{}\n", "Events".cyan().bold()));
    for event in &report.events {
        output.push_str(&format!("  {}\n", event.name()));
    }

    let failed = report.failed_steps();
    if failed > 0 {
        output.push_str(&format!(
            "\n{}\n",
            format!("{} of {} steps failed", failed, report.steps.len()).yellow()
        ));
    }

    output
}
