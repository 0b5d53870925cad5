//! Plain-text rendering of backend results for the terminal.

use chrono::Local;
use finance_tracker_backend::domain::calendar::month_name;
use shared::{
    ImportSummary, MonthSection, MonthSummary, Movement, MovementTotals, PreferencesSnapshot,
    ThemeMode,
};
use std::fmt::Write;

pub fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn signed(movement: &Movement) -> String {
    format!("{:+.2}", movement.signed_amount())
}

fn month_title(year: i32, month: u32) -> String {
    format!("{} {}", month_name(month), year)
}

fn totals_line(totals: &MovementTotals) -> String {
    format!(
        "income {}  expense {}  balance {}",
        amount(totals.income),
        amount(totals.expense),
        amount(totals.balance)
    )
}

fn movement_date(movement: &Movement) -> String {
    movement
        .timestamp()
        .map(|dt| dt.with_timezone(&Local).format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "??/??/????".to_string())
}

pub fn movement_line(movement: &Movement) -> String {
    let mut line = format!("  {}  {:>12}  {}", movement_date(movement), signed(movement), movement.title);
    if !movement.subtitle.is_empty() {
        let _ = write!(line, " ({})", movement.subtitle);
    }
    line
}

/// Month totals followed by the days that had activity
pub fn summary(summary: &MonthSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", month_title(summary.year, summary.month));
    let _ = writeln!(out, "  {}", totals_line(&summary.totals));
    let _ = writeln!(out, "  {} movements", summary.movement_count);

    let daily = &summary.daily;
    let active_days: Vec<usize> = (0..daily.days as usize)
        .filter(|&i| daily.income[i] != 0.0 || daily.expense[i] != 0.0)
        .collect();
    if !active_days.is_empty() {
        let _ = writeln!(out, "  {:>3}  {:>12}  {:>12}  {:>12}", "day", "income", "expense", "balance");
        for i in active_days {
            let _ = writeln!(
                out,
                "  {:>3}  {:>12}  {:>12}  {:>12}",
                i + 1,
                amount(daily.income[i]),
                amount(daily.expense[i]),
                amount(daily.balance[i])
            );
        }
    }
    out
}

pub fn section(section: &MonthSection, totals: &MovementTotals) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  ({})", month_title(section.year, section.month), totals_line(totals));
    for movement in &section.movements {
        let _ = writeln!(out, "{}", movement_line(movement));
    }
    out
}

pub fn import(summary: &ImportSummary) -> String {
    format!(
        "Read {} lines: {} parsed, {} dropped, {} movements stored",
        summary.lines_read, summary.rows_parsed, summary.lines_dropped, summary.movements_stored
    )
}

pub fn preferences(prefs: &PreferencesSnapshot) -> String {
    let theme = match prefs.theme {
        ThemeMode::System => "system",
        ThemeMode::Light => "light",
        ThemeMode::Dark => "dark",
    };
    format!(
        "theme: {}\nlanguage: {}\ntext scale: {}\nselected account: {}",
        theme,
        prefs.language,
        prefs.text_scale,
        prefs.selected_account.as_deref().unwrap_or("(none)")
    )
}
