// Cross-scheme executive report for a single block.
use crate::aggregate::{block_aggregates, group_by_block};
use crate::briefs::{rank_ascending, ranked_gp, ContextColumns, BOTTOM_N};
use crate::identity::resolve_identity_keys;
use crate::metric::infer_metric;
use crate::normalize::normalize_block_name;
use crate::types::{Dataset, Datasets, RankedGp, SchemeGroup};
use crate::util::{display_number, format_grouped};
use chrono::NaiveDate;
use tracing::{debug, warn};

pub const NO_DATA_MESSAGE: &str = "No data found for this block across active schemes.\n\
Please check if the block name matches the data sheets.";

const RULE: &str = "--------------------------------------------------";

/// How far a block trails the best block for a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Healthy,
}

impl Severity {
    pub fn from_gap(gap: f64) -> Self {
        if gap > 20.0 {
            Severity::Critical
        } else if gap >= 10.0 {
            Severity::Warning
        } else {
            Severity::Healthy
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::Warning => "🟠",
            Severity::Healthy => "🟢",
        }
    }
}

/// Render the report for `target_block` over the active schemes, grouped as
/// configured. Returns [`NO_DATA_MESSAGE`] when no scheme has rows for the block.
pub fn generate_report(
    target_block: &str,
    groups: &[SchemeGroup],
    datasets: &Datasets,
    active_schemes: &[String],
    generated_on: NaiveDate,
) -> String {
    let block = normalize_block_name(target_block);
    let mut sections: Vec<String> = Vec::new();

    for group in groups {
        let mut group_lines: Vec<String> = Vec::new();
        for scheme in group.schemes.iter().filter(|s| active_schemes.contains(*s)) {
            let Some(dataset) = datasets.get(scheme).filter(|d| !d.is_empty()) else {
                continue;
            };
            if let Some(section) = scheme_section(scheme, dataset, &block) {
                group_lines.push(section);
            }
        }
        if !group_lines.is_empty() {
            sections.push(format!("\n*📂 GROUP: {}*", group.title.to_uppercase()));
            sections.extend(group_lines);
        }
    }

    if sections.is_empty() {
        debug!(block = %block, "no scheme produced report output");
        return NO_DATA_MESSAGE.to_string();
    }

    let mut lines = vec![
        format!("*🚨 CEO BLOCK PROGRESS REPORT: {}*", block.to_uppercase()),
        format!("_generated on {}_", generated_on.format("%d/%m/%Y")),
        RULE.to_string(),
    ];
    lines.extend(sections);
    lines.push(format!("\n{RULE}"));
    lines.push("Action Required: Review these low performing GPs and initiate review meetings.".to_string());
    lines.join("\n")
}

fn scheme_section(scheme: &str, dataset: &Dataset, block: &str) -> Option<String> {
    let labels = dataset.columns();
    let Some(metric) = infer_metric(&labels) else {
        warn!(scheme, "report: skipping scheme without a progress metric");
        return None;
    };
    let keys = resolve_identity_keys(&labels);
    if keys.block_key.is_none() {
        warn!(scheme, "report: skipping scheme without a block column");
        return None;
    }

    let own_rows = group_by_block(dataset, &keys)
        .into_iter()
        .find(|(name, _)| name == block)
        .map(|(_, rows)| rows)
        .unwrap_or_default();
    if own_rows.is_empty() {
        debug!(scheme, block, "report: block has no rows for scheme");
        return None;
    }

    let aggregates = block_aggregates(dataset, &metric, &keys);
    let mut top: Option<(&str, f64)> = None;
    for agg in &aggregates {
        if let Some(v) = agg.value.number() {
            if top.map_or(true, |(_, best)| v > best) {
                top = Some((agg.block.as_str(), v));
            }
        }
    }
    let own = aggregates
        .iter()
        .find(|a| a.block == block)
        .and_then(|a| a.value.number());

    let unit = metric.unit();
    let mut lines = vec![format!("\n*📌 Scheme: {scheme}*")];
    match (own, top) {
        (Some(own), Some((top_block, best))) => {
            let gap = best - own;
            lines.push(format!(
                "{} Your Avg: *{}{unit}* | Top Block ({top_block}): *{}{unit}*",
                Severity::from_gap(gap).marker(),
                display_number(own),
                display_number(best),
            ));
            if own < best {
                lines.push(format!("📉 Gap: -{}{unit} from Top", display_number(gap)));
            } else {
                lines.push("🏆 You are the Top Performer!".to_string());
            }
        }
        _ => lines.push("⚪ Your Avg: *N/A*".to_string()),
    }

    let ctx = ContextColumns::resolve(&metric, &labels);
    let weakest: Vec<RankedGp> = rank_ascending(&metric, &own_rows)
        .into_iter()
        .take(BOTTOM_N)
        .map(|(row, v)| ranked_gp(row, v, keys.gp_key.as_deref(), &ctx))
        .collect();
    if !weakest.is_empty() {
        lines.push(format!("_⚠️ Weakest Links (Bottom {BOTTOM_N} GPs):_"));
        for (i, gp) in weakest.iter().enumerate() {
            let value = display_number(gp.value);
            let details = match (gp.target, gp.done) {
                (Some(t), Some(d)) => format!(
                    "({value}{unit} | T:{}/D:{})",
                    format_grouped(t),
                    format_grouped(d)
                ),
                _ => format!("({value}{unit})"),
            };
            lines.push(format!("{}. {} {details}", i + 1, gp.name));
        }
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn groups() -> Vec<SchemeGroup> {
        vec![SchemeGroup {
            id: "housing".into(),
            title: "Housing".into(),
            schemes: vec!["PMAY".into(), "SBM".into()],
        }]
    }

    fn pmay() -> Dataset {
        Dataset::new(vec![
            Row::new().with("Block", "Dantewada").with("GP", "A").with("Target", 100.0).with("Sanction Done", 40.0),
            Row::new().with("Block", "दंतेवाड़ा").with("GP", "B").with("Target", 50.0).with("Sanction Done", 45.0),
            Row::new().with("Block", "Geedam").with("GP", "C").with("Target", 200.0).with("Sanction Done", 180.0),
        ])
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::from_gap(25.0), Severity::Critical);
        assert_eq!(Severity::from_gap(20.0), Severity::Warning);
        assert_eq!(Severity::from_gap(10.0), Severity::Warning);
        assert_eq!(Severity::from_gap(9.0), Severity::Healthy);
    }

    #[test]
    fn report_compares_against_top_block() {
        let mut data = Datasets::new();
        data.insert("PMAY".into(), pmay());
        data.insert("SBM".into(), Dataset::default());
        let active = vec!["PMAY".to_string(), "SBM".to_string()];
        let text = generate_report("dantewada", &groups(), &data, &active, date());
        assert!(text.starts_with("*🚨 CEO BLOCK PROGRESS REPORT: DANTEWADA*\n_generated on 18/10/2026_"));
        assert!(text.contains("*📂 GROUP: HOUSING*"));
        assert!(text.contains("🔴 Your Avg: *57%* | Top Block (Geedam): *90%*"));
        assert!(text.contains("📉 Gap: -33% from Top"));
        assert!(text.contains("1. A (40% | T:100/D:40)\n2. B (90% | T:50/D:45)"));
        assert!(!text.contains("SBM"));
    }

    #[test]
    fn top_performer_line() {
        let mut data = Datasets::new();
        data.insert("PMAY".into(), pmay());
        let text = generate_report("Gidam", &groups(), &data, &["PMAY".to_string()], date());
        assert!(text.contains("🟢 Your Avg: *90%* | Top Block (Geedam): *90%*"));
        assert!(text.contains("🏆 You are the Top Performer!"));
    }

    #[test]
    fn inactive_or_missing_block_yields_no_data_message() {
        let mut data = Datasets::new();
        data.insert("PMAY".into(), pmay());
        assert_eq!(generate_report("Dantewada", &groups(), &data, &[], date()), NO_DATA_MESSAGE);
        assert_eq!(
            generate_report("Katekalyan", &groups(), &data, &["PMAY".to_string()], date()),
            NO_DATA_MESSAGE
        );
    }
}
