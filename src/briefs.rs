// Intervention briefs: per-GP alerts for critically low percentages and
// per-block status messages with the block's weakest GPs.
use crate::aggregate::{aggregate_group, group_by_block};
use crate::identity::{is_unit_row, resolve_identity_keys};
use crate::metric::{done_column, infer_metric, target_column};
use crate::normalize::normalize_block_name;
use crate::types::{
    AggregateValue, Brief, BriefLevel, Dataset, Datasets, MetricDescriptor, Officers, RankedGp, Row,
};
use crate::util::{display_number, parse_cell};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// GP values at or above this are not critical.
pub const CRITICAL_THRESHOLD: f64 = 40.0;
/// Briefs per scheme at GP level, and GPs listed per block.
pub const BOTTOM_N: usize = 10;

const FALLBACK_OFFICER: &str = "District Nodal";

/// Columns that give target/done context next to a ranked GP.
#[derive(Debug, Default, Clone)]
pub struct ContextColumns {
    pub target: Option<String>,
    pub done: Option<String>,
}

impl ContextColumns {
    pub fn resolve(metric: &MetricDescriptor, labels: &[String]) -> Self {
        match (metric.target_key(), metric.done_key()) {
            (Some(t), Some(d)) => Self {
                target: Some(t.to_string()),
                done: Some(d.to_string()),
            },
            _ => Self {
                target: target_column(labels).cloned(),
                done: done_column(labels).cloned(),
            },
        }
    }
}

/// Rows ascending by rank value, ties kept in source order. Blank cells rank
/// as 0; ratio rows with no target are dropped.
pub fn rank_ascending<'a>(metric: &MetricDescriptor, rows: &[&'a Row]) -> Vec<(&'a Row, f64)> {
    let mut ranked: Vec<(&Row, f64)> = rows
        .iter()
        .filter_map(|r| metric.rank_value(r).map(|v| (*r, v)))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    ranked
}

pub fn ranked_gp(row: &Row, value: f64, gp_key: Option<&str>, ctx: &ContextColumns) -> RankedGp {
    RankedGp {
        name: gp_key
            .and_then(|k| row.text(k))
            .unwrap_or_else(|| "Unknown GP".to_string()),
        value,
        target: ctx.target.as_deref().and_then(|k| parse_cell(row.get(k))),
        done: ctx.done.as_deref().and_then(|k| parse_cell(row.get(k))),
    }
}

/// Briefs for every listed scheme that has data, at the requested level.
/// Schemes lacking the metric or identity columns a level needs are skipped.
pub fn generate_briefs(
    schemes: &[String],
    datasets: &Datasets,
    officers: &Officers,
    level: BriefLevel,
) -> Vec<Brief> {
    let mut briefs = Vec::new();
    for scheme in schemes {
        let Some(dataset) = datasets.get(scheme).filter(|d| !d.is_empty()) else {
            continue;
        };
        let produced = match level {
            BriefLevel::Gp => gp_briefs(scheme, dataset, officers),
            BriefLevel::Block => block_briefs(scheme, dataset),
        };
        debug!(scheme = %scheme, %level, count = produced.len(), "briefs generated");
        briefs.extend(produced);
    }
    briefs
}

fn gp_briefs(scheme: &str, dataset: &Dataset, officers: &Officers) -> Vec<Brief> {
    let labels = dataset.columns();
    let Some(metric) = infer_metric(&labels) else {
        warn!(scheme, "skipping GP briefs: no progress metric");
        return Vec::new();
    };
    let keys = resolve_identity_keys(&labels);
    let Some(gp_key) = keys.gp_key.as_deref() else {
        warn!(scheme, "skipping GP briefs: no gram panchayat column");
        return Vec::new();
    };
    if !metric.is_percentage {
        debug!(scheme, label = %metric.label, "count metric has no critical threshold");
        return Vec::new();
    }

    let units: Vec<&Row> = dataset.rows().iter().filter(|r| is_unit_row(r, &keys)).collect();
    let ctx = ContextColumns::resolve(&metric, &labels);
    let officer = officers
        .get(scheme)
        .map(|o| format!("{} ({})", o.name, o.designation))
        .unwrap_or_else(|| FALLBACK_OFFICER.to_string());

    rank_ascending(&metric, &units)
        .into_iter()
        .filter(|(_, v)| (0.0..CRITICAL_THRESHOLD).contains(v))
        .take(BOTTOM_N)
        .map(|(row, value)| {
            let gp = ranked_gp(row, value, Some(gp_key), &ctx);
            let block = keys
                .block_key
                .as_deref()
                .and_then(|k| row.text(k))
                .map(|b| normalize_block_name(&b))
                .unwrap_or_else(|| "Unknown".to_string());
            let message = format!(
                "In {scheme}, Gram Panchayat {} of {block} Block is at {}%. \
                 Please coordinate with {officer} and resolve this immediately.",
                gp.name,
                display_number(value),
            );
            Brief {
                level: BriefLevel::Gp,
                scheme: scheme.to_string(),
                block,
                title: gp.name.clone(),
                value: AggregateValue::Number(value),
                message,
                details: vec![gp],
            }
        })
        .collect()
}

fn block_briefs(scheme: &str, dataset: &Dataset) -> Vec<Brief> {
    let labels = dataset.columns();
    let Some(metric) = infer_metric(&labels) else {
        warn!(scheme, "skipping block briefs: no progress metric");
        return Vec::new();
    };
    let keys = resolve_identity_keys(&labels);
    if keys.block_key.is_none() {
        warn!(scheme, "skipping block briefs: no block column");
        return Vec::new();
    }
    let ctx = ContextColumns::resolve(&metric, &labels);
    let unit = metric.unit();
    let headline = if metric.is_percentage {
        "Overall Block Progress".to_string()
    } else {
        format!("Overall Block {}", metric.label)
    };

    group_by_block(dataset, &keys)
        .into_iter()
        .map(|(block, rows)| {
            let value = aggregate_group(&metric, &rows);
            let bottom: Vec<RankedGp> = rank_ascending(&metric, &rows)
                .into_iter()
                .take(BOTTOM_N)
                .map(|(row, v)| ranked_gp(row, v, keys.gp_key.as_deref(), &ctx))
                .collect();
            let list = bottom
                .iter()
                .enumerate()
                .map(|(i, gp)| format!("{}. {} ({}{unit})", i + 1, gp.name, display_number(gp.value)))
                .collect::<Vec<_>>()
                .join("\n");
            let shown = match value {
                AggregateValue::Number(_) => format!("{value}{unit}"),
                AggregateValue::NotAvailable => value.to_string(),
            };
            let message = format!(
                "*{scheme} - {block} Block Report*\n\
                 To Block Nodal,\n\
                 {headline}: *{shown}*\n\n\
                 *Bottom {BOTTOM_N} GPs requiring immediate attention:*\n\
                 {list}\n\n\
                 Please direct AOs/Secretaries to improve coverage immediately."
            );
            Brief {
                level: BriefLevel::Block,
                scheme: scheme.to_string(),
                block: block.clone(),
                title: block,
                value,
                message,
                details: bottom,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Officer;

    fn scheme() -> Vec<String> {
        vec!["PMAY".to_string()]
    }

    fn data(rows: Vec<Row>) -> Datasets {
        let mut d = Datasets::new();
        d.insert("PMAY".to_string(), Dataset::new(rows));
        d
    }

    fn pct_row(block: &str, gp: &str, v: &str) -> Row {
        Row::new().with("Block", block).with("GP", gp).with("Progress %", v)
    }

    #[test]
    fn gp_briefs_take_worst_below_threshold() {
        let mut rows: Vec<Row> = (0..15).map(|i| pct_row("Geedam", &format!("G{i}"), &format!("{}", 30 - i))).collect();
        rows.push(pct_row("Geedam", "High", "85%"));
        rows.push(pct_row("Geedam", "Edge", "40"));
        let mut officers = Officers::new();
        officers.insert(
            "PMAY".into(),
            Officer { name: "Mr. Amit Verma".into(), designation: "Housing Coordinator".into() },
        );
        let briefs = generate_briefs(&scheme(), &data(rows), &officers, BriefLevel::Gp);
        assert_eq!(briefs.len(), BOTTOM_N);
        assert_eq!(briefs[0].title, "G14");
        assert_eq!(briefs[0].value, AggregateValue::Number(16.0));
        assert!(briefs.iter().all(|b| b.value.number().is_some_and(|v| (0.0..40.0).contains(&v))));
        assert!(briefs[0].message.contains("Gram Panchayat G14 of Geedam Block is at 16%"));
        assert!(briefs[0].message.contains("Mr. Amit Verma (Housing Coordinator)"));
    }

    #[test]
    fn gp_ties_keep_source_order() {
        let rows = vec![pct_row("Geedam", "B", "5"), pct_row("Geedam", "A", "5")];
        let briefs = generate_briefs(&scheme(), &data(rows), &Officers::new(), BriefLevel::Gp);
        let titles: Vec<&str> = briefs.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert!(briefs[0].message.contains("District Nodal"));
    }

    #[test]
    fn blank_progress_ranks_as_worst() {
        let rows = vec![pct_row("Geedam", "Low", "12"), pct_row("Geedam", "Blank", ""), pct_row("Geedam", "Missing", "N/A")];
        let d = data(rows);
        let gp = generate_briefs(&scheme(), &d, &Officers::new(), BriefLevel::Gp);
        let titles: Vec<&str> = gp.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Blank", "Missing", "Low"]);
        assert_eq!(gp[0].value, AggregateValue::Number(0.0));

        let block = generate_briefs(&scheme(), &d, &Officers::new(), BriefLevel::Block);
        let names: Vec<&str> = block[0].details.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Blank", "Missing", "Low"]);
        // The block headline still averages only the readable value.
        assert_eq!(block[0].value, AggregateValue::Number(12.0));
    }

    #[test]
    fn count_metrics_produce_no_gp_briefs() {
        let rows = vec![Row::new().with("Block", "Geedam").with("GP", "A").with("Works", 1.0)];
        assert!(generate_briefs(&scheme(), &data(rows), &Officers::new(), BriefLevel::Gp).is_empty());
    }

    #[test]
    fn missing_gp_column_skips_gp_level_only() {
        let rows = vec![Row::new().with("Block", "Geedam").with("Progress %", "10")];
        let d = data(rows);
        assert!(generate_briefs(&scheme(), &d, &Officers::new(), BriefLevel::Gp).is_empty());
        assert_eq!(generate_briefs(&scheme(), &d, &Officers::new(), BriefLevel::Block).len(), 1);
    }

    #[test]
    fn one_block_brief_per_block_even_when_healthy() {
        let rows = vec![
            pct_row("Geedam", "A", "90"),
            pct_row("gidam", "B", "80"),
            pct_row("Dantewada", "C", "10"),
            pct_row("Total", "", "60"),
        ];
        let briefs = generate_briefs(&scheme(), &data(rows), &Officers::new(), BriefLevel::Block);
        let blocks: Vec<&str> = briefs.iter().map(|b| b.block.as_str()).collect();
        assert_eq!(blocks, vec!["Geedam", "Dantewada"]);
        assert_eq!(briefs[0].value, AggregateValue::Number(85.0));
        assert_eq!(briefs[0].details.len(), 2);
        assert_eq!(briefs[0].details[0].name, "B");
        assert!(briefs[0].message.contains("Overall Block Progress: *85%*"));
        assert!(briefs[0].message.contains("1. B (80%)\n2. A (90%)"));
    }

    #[test]
    fn calculated_block_brief_is_weighted_and_carries_context() {
        let rows = vec![
            Row::new().with("Block", "Dantewada").with("GP", "A").with("Target", 100.0).with("Sanction Done", 40.0),
            Row::new().with("Block", "Dantewada").with("GP", "B").with("Target", 50.0).with("Sanction Done", 45.0),
        ];
        let briefs = generate_briefs(&scheme(), &data(rows), &Officers::new(), BriefLevel::Block);
        assert_eq!(briefs.len(), 1);
        assert_eq!(briefs[0].value, AggregateValue::Number(57.0));
        assert_eq!(briefs[0].details[0].target, Some(100.0));
        assert_eq!(briefs[0].details[0].done, Some(40.0));
    }

    #[test]
    fn empty_or_unlisted_schemes_contribute_nothing() {
        let mut d = Datasets::new();
        d.insert("PMAY".into(), Dataset::default());
        assert!(generate_briefs(&scheme(), &d, &Officers::new(), BriefLevel::Block).is_empty());
        assert!(generate_briefs(&["SBM".to_string()], &d, &Officers::new(), BriefLevel::Gp).is_empty());
    }
}
