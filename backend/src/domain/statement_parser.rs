//! # Statement Parser
//!
//! Turns bank statement exports into [`ParsedRow`]s. Each line carries three
//! fields, `date SEP description SEP amount`, where the separator is the first
//! of `;`, tab or `,` present on the line. Dates are `dd/mm/yyyy` on the local
//! calendar. Amounts may use either the European (`1.234,56`) or the English
//! (`1,234.56`) convention; the decimal separator is inferred per value.
//!
//! Lines that cannot be parsed are dropped without failing the whole import.

use chrono::{Local, NaiveDate, TimeZone};
use log::debug;
use shared::ParsedRow;

use super::calendar::local_midnight_millis;

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Separators in priority order
const SEPARATORS: [char; 3] = [';', '\t', ','];

/// Parse statement lines using the device's local calendar
pub fn parse_lines<I, S>(lines: I) -> Vec<ParsedRow>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_lines_in(&Local, lines)
}

/// Parse statement lines on the calendar of `tz`.
///
/// Output keeps input order; dropped lines leave no gaps.
pub fn parse_lines_in<Tz, I, S>(tz: &Tz, lines: I) -> Vec<ParsedRow>
where
    Tz: TimeZone,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref();
            let row = parse_line_in(tz, line);
            if row.is_none() {
                debug!("Dropping unparseable statement line: {:?}", line);
            }
            row
        })
        .collect()
}

/// Parse a whole statement file using the device's local calendar
pub fn parse_text(text: &str) -> Vec<ParsedRow> {
    parse_lines(statement_lines(text))
}

/// Non-blank lines of a statement file, with `\r\n` endings handled
pub fn statement_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.trim().is_empty())
}

/// Parse a single line, returning `None` when it has to be dropped
pub fn parse_line_in<Tz: TimeZone>(tz: &Tz, line: &str) -> Option<ParsedRow> {
    let separator = SEPARATORS.iter().copied().find(|sep| line.contains(*sep))?;

    let fields: Vec<&str> = line.splitn(3, separator).collect();
    if fields.len() < 3 {
        return None;
    }

    let date = NaiveDate::parse_from_str(fields[0].trim(), DATE_FORMAT).ok()?;
    let date_millis = local_midnight_millis(tz, date)?;
    let amount = normalize_amount(fields[2])?;

    Some(ParsedRow {
        date_millis,
        description: fields[1].trim().to_string(),
        amount,
    })
}

/// Convert a locale-formatted amount into a number.
///
/// Everything except digits, signs, `.` and `,` is discarded first. When both
/// `.` and `,` appear, the rightmost one is the decimal separator and the other
/// is thousands grouping. With a single kind of separator, its last occurrence
/// is the decimal separator and earlier ones are grouping.
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ','))
        .collect();

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) => keep_last_as_decimal(&cleaned, ','),
        (None, Some(_)) => keep_last_as_decimal(&cleaned, '.'),
        (None, None) => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Drop every `separator` except the last, which becomes `.`
fn keep_last_as_decimal(value: &str, separator: char) -> String {
    let last = match value.rfind(separator) {
        Some(index) => index,
        None => return value.to_string(),
    };

    value
        .char_indices()
        .filter_map(|(index, c)| match c {
            c if c == separator && index == last => Some('.'),
            c if c == separator => None,
            c => Some(c),
        })
        .collect()
}
