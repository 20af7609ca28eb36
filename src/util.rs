// Utility helpers for cell parsing, rounding and number formatting.
//
// Spreadsheet cells arrive as free text ("37%", " 1,200 ", "N/A", ""), so all
// numeric interpretation goes through here and the rest of the code works on
// `Option<f64>`.
use crate::types::CellValue;
use num_format::{Locale, ToFormattedString};

/// Parse a cell's text into `f64`, forgiving the formatting that shows up in
/// published sheets.
///
/// - Trims whitespace and a trailing `%`.
/// - Strips a leading rupee sign and thousands separators.
/// - Rejects values that contain alphabetic characters ("N/A", "Total").
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim();
    let s = s.strip_prefix('₹').unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Strict reading of a cell: `None` when missing or unparsable.
pub fn parse_cell(cell: Option<&CellValue>) -> Option<f64> {
    match cell? {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) => None,
        CellValue::Text(s) => parse_number(s),
    }
}

/// Lenient reading used for sums: anything unparsable counts as zero.
pub fn cell_or_zero(cell: Option<&CellValue>) -> f64 {
    parse_cell(cell).unwrap_or(0.0)
}

/// Round half up, matching how dashboards round (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Short display form: integers without decimals, otherwise at most two
/// decimals with trailing zeros removed (`37`, `12.5`, `33.33`).
pub fn display_number(n: f64) -> String {
    let rounded = (n * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        return format!("{:.0}", rounded);
    }
    let s = format!("{:.2}", rounded);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Grouped form of `display_number`: `12,500` or `1,234.5`.
pub fn format_grouped(n: f64) -> String {
    let rounded = (n * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        return format_number(rounded, 0);
    }
    let s = format_number(rounded, 2);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percent_and_grouped_numbers() {
        assert_eq!(parse_number("37%"), Some(37.0));
        assert_eq!(parse_number(" 45.5 % "), Some(45.5));
        assert_eq!(parse_number("1,200"), Some(1200.0));
        assert_eq!(parse_number("₹ 2,500.75"), Some(2500.75));
    }

    #[test]
    fn rejects_blank_and_text() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("Total"), None);
        assert_eq!(parse_cell(None), None);
        assert_eq!(cell_or_zero(Some(&CellValue::from("N/A"))), 0.0);
    }

    #[test]
    fn numeric_cells_pass_through() {
        assert_eq!(parse_cell(Some(&CellValue::Number(12.0))), Some(12.0));
        assert_eq!(parse_cell(Some(&CellValue::Number(f64::NAN))), None);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_half_up(56.5), 57.0);
        assert_eq!(round_half_up(75.71), 76.0);
        assert_eq!(round_half_up(-2.5), -2.0);
    }

    #[test]
    fn displays_compact_numbers() {
        assert_eq!(display_number(37.0), "37");
        assert_eq!(display_number(12.5), "12.5");
        assert_eq!(display_number(100.0 / 3.0), "33.33");
        assert_eq!(display_number(-0.0), "0");
        assert_eq!(format_grouped(12500.0), "12,500");
        assert_eq!(format_grouped(1234.5), "1,234.5");
        assert_eq!(format_number(-1234.567, 2), "-1,234.57");
    }

    #[test]
    fn average_of_empty_is_none() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[10.0, 20.0]), Some(15.0));
    }
}
