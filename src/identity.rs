// Block / Gram Panchayat column resolution and subtotal-row detection.
use crate::types::{IdentityKeys, Row};
use tracing::debug;

const GP_KEYWORDS_EXACT: [&str; 3] = ["gram panchayat", "gp name", "gp"];
const GP_KEYWORDS_SUBSTRING: [&str; 5] = ["gram panchayat", "gp name", "gp", "panchayat", "name of gp"];

/// How strictly a GP column label has to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpMatch {
    /// Whole label equals a keyword. Used for table display.
    Exact,
    /// Exact pass first, then any label containing a keyword.
    Substring,
}

pub fn resolve_block_key(labels: &[String]) -> Option<String> {
    labels
        .iter()
        .find(|l| l.to_lowercase().contains("block"))
        .cloned()
}

pub fn resolve_gp_key(labels: &[String], strictness: GpMatch) -> Option<String> {
    let lowered: Vec<String> = labels.iter().map(|l| l.trim().to_lowercase()).collect();
    let exact = GP_KEYWORDS_EXACT
        .iter()
        .find_map(|kw| lowered.iter().position(|l| l == kw));
    if let Some(i) = exact {
        return Some(labels[i].clone());
    }
    if strictness == GpMatch::Exact {
        return None;
    }
    GP_KEYWORDS_SUBSTRING
        .iter()
        .find_map(|kw| lowered.iter().position(|l| l.contains(*kw)))
        .map(|i| labels[i].clone())
}

/// Resolve both identity columns with the alerting (substring) strictness.
pub fn resolve_identity_keys(labels: &[String]) -> IdentityKeys {
    let keys = IdentityKeys {
        block_key: resolve_block_key(labels),
        gp_key: resolve_gp_key(labels, GpMatch::Substring),
    };
    debug!(block = ?keys.block_key, gp = ?keys.gp_key, "identity keys resolved");
    keys
}

fn is_total(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("total")
}

/// Pre-aggregated "Total" row, identified through the block column.
pub fn is_total_row(row: &Row, keys: &IdentityKeys) -> bool {
    keys.block_key
        .as_deref()
        .and_then(|k| row.text(k))
        .is_some_and(|v| is_total(&v))
}

/// Any subtotal row: a block-column Total, or a GP cell reading "Total".
pub fn is_subtotal_row(row: &Row, keys: &IdentityKeys) -> bool {
    is_total_row(row, keys)
        || keys
            .gp_key
            .as_deref()
            .and_then(|k| row.text(k))
            .is_some_and(|v| is_total(&v))
}

/// Block-column values that label a district or grand-total line rather than a block.
pub fn is_summary_block(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower == "total" || lower.contains("district") || lower.contains("योग")
}

/// A row that should be aggregated bottom-up: not a Total sentinel, not a
/// GP-level Total, not a district/grand-total line.
pub fn is_unit_row(row: &Row, keys: &IdentityKeys) -> bool {
    if is_subtotal_row(row, keys) {
        return false;
    }
    !keys
        .block_key
        .as_deref()
        .and_then(|k| row.text(k))
        .is_some_and(|b| is_summary_block(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn block_key_is_first_label_mentioning_block() {
        let cols = labels(&["S.No", "Name of Block", "Block Code"]);
        assert_eq!(resolve_block_key(&cols).as_deref(), Some("Name of Block"));
        assert_eq!(resolve_block_key(&labels(&["District"])), None);
    }

    #[test]
    fn exact_gp_match_wins_over_earlier_substring() {
        let cols = labels(&["Panchayat Code", "GP"]);
        assert_eq!(resolve_gp_key(&cols, GpMatch::Substring).as_deref(), Some("GP"));
        assert_eq!(resolve_gp_key(&cols, GpMatch::Exact).as_deref(), Some("GP"));
    }

    #[test]
    fn substring_only_when_allowed() {
        let cols = labels(&["Block", "Name of Gram Panchayat"]);
        assert_eq!(resolve_gp_key(&cols, GpMatch::Exact), None);
        assert_eq!(
            resolve_gp_key(&cols, GpMatch::Substring).as_deref(),
            Some("Name of Gram Panchayat")
        );
    }

    #[test]
    fn total_rows_are_detected_through_block_column() {
        let keys = resolve_identity_keys(&labels(&["Block", "GP"]));
        let total = Row::new().with("Block", " TOTAL ").with("GP", "");
        let unit = Row::new().with("Block", "Geedam").with("GP", "A");
        let gp_total = Row::new().with("Block", "Geedam").with("GP", "Total");
        assert!(is_total_row(&total, &keys));
        assert!(!is_total_row(&unit, &keys));
        assert!(!is_total_row(&gp_total, &keys));
        assert!(is_subtotal_row(&gp_total, &keys));
    }

    #[test]
    fn summary_block_names() {
        assert!(is_summary_block("District Total"));
        assert!(is_summary_block("कुल योग"));
        assert!(!is_summary_block("Geedam"));
    }
}
