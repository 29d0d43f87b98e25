//! Table formatting for curves, steps and accounts.

use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use super::format_percent;
use crate::commands::CurvePoint;
use crate::scenario::{AccountSummary, StepOutcome};

#[derive(Tabled)]
struct CurveRow {
    #[tabled(rename = "Utilization")]
    utilization: String,
    #[tabled(rename = "Borrow APY")]
    borrow_apy: String,
    #[tabled(rename = "Supply APY")]
    supply_apy: String,
    #[tabled(rename = "Borrow Rate / Block")]
    borrow_rate: String,
    #[tabled(rename = "Region")]
    region: String,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Block")]
    block: u64,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Account")]
    address: String,
    #[tabled(rename = "Wallet")]
    wallet: String,
    #[tabled(rename = "Shares")]
    shares: String,
    #[tabled(rename = "Supplied")]
    supplied: String,
    #[tabled(rename = "Debt")]
    debt: String,
}

fn truncate_address(addr: &str) -> String {
    if addr.len() > 10 {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    table.to_string()
}

pub fn format_curve_table(points: &[CurvePoint]) -> String {
    let rows: Vec<CurveRow> = points
        .iter()
        .map(|p| CurveRow {
            utilization: format_percent(p.utilization),
            borrow_apy: format_percent(p.borrow_apy),
            supply_apy: format_percent(p.supply_apy),
            borrow_rate: p.borrow_rate_per_block.clone(),
            region: if p.above_kink { "jump" } else { "normal" }.to_string(),
        })
        .collect();

    render(rows)
}

pub fn format_steps_table(steps: &[StepOutcome]) -> String {
    if steps.is_empty() {
        return "No steps.".to_string();
    }

    let rows: Vec<StepRow> = steps
        .iter()
        .map(|s| StepRow {
            index: s.index,
            block: s.block,
            action: s.action.to_string(),
            account: s
                .account
                .map(|a| truncate_address(&a.to_string()))
                .unwrap_or_else(|| "-".to_string()),
            result: match &s.error_kind {
                Some(kind) => format!("FAILED ({}): {}", kind, s.detail),
                None => s.detail.clone(),
            },
        })
        .collect();

    render(rows)
}

pub fn format_accounts_table(accounts: &[AccountSummary]) -> String {
    if accounts.is_empty() {
        return "No accounts.".to_string();
    }

    let rows: Vec<AccountRow> = accounts
        .iter()
        .map(|a| AccountRow {
            address: truncate_address(&a.address.to_string()),
            wallet: a.wallet.clone(),
            shares: a.shares.clone(),
            supplied: a.supplied.clone(),
            debt: a.debt.clone(),
        })
        .collect();

    render(rows)
}
