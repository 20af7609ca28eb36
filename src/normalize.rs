// Block name normalization.

/// Canonical block names and the spellings seen for each in district sheets
/// (Latin variants and Devanagari). Checked in order, first containment wins.
const BLOCK_ALIASES: &[(&str, &[&str])] = &[
    ("Dantewada", &["dantewada", "dantewara", "दंतेवाड़ा", "दन्तेवाड़ा"]),
    ("Geedam", &["geedam", "gidam", "गीदम"]),
    ("Katekalyan", &["katekalyan", "katikalyan", "कटेकल्याण"]),
    ("Kuwakonda", &["kuwakonda", "kuakonda", "kuakonta", "कुआकोन्डा", "कुआकोंडा"]),
];

/// Map a free-text block name onto its canonical spelling. Unknown names are
/// returned trimmed so new blocks still show up.
pub fn normalize_block_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    BLOCK_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| lower.contains(a)))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
