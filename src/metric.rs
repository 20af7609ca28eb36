// Primary-metric inference.
//
// Sheets arrive with arbitrary headers, so "progress" is decided by an
// ordered rule table over the column labels. The first rule that yields a
// descriptor wins; every consumer (summary cards, drill-down, briefs,
// report) goes through `infer_metric` so they agree on what progress means.
use crate::types::{Dataset, MetricDescriptor, MetricSource, Row};
use crate::util::{cell_or_zero, parse_cell};
use tracing::debug;

/// Keywords for the numerator of a ratio metric, in priority order.
const DONE_KEYWORDS: [&str; 4] = ["sanction done", "registration done", "achievement", "completed"];

/// Last-resort magnitude columns.
const COUNT_KEYWORDS: [&str; 5] = ["beneficiar", "works", "amount", "cost", "total"];

/// One entry of the inference table.
pub struct InferenceRule {
    pub name: &'static str,
    pub infer: fn(&[String]) -> Option<MetricDescriptor>,
}

/// Evaluated top to bottom; order is the priority.
pub const RULES: &[InferenceRule] = &[
    InferenceRule { name: "sanction-percentage", infer: sanction_percentage },
    InferenceRule { name: "completion-percentage", infer: completion_percentage },
    InferenceRule { name: "generic-percentage", infer: generic_percentage },
    InferenceRule { name: "target-done-ratio", infer: target_done_ratio },
    InferenceRule { name: "count", infer: count_column },
];

pub fn infer_metric(labels: &[String]) -> Option<MetricDescriptor> {
    for rule in RULES {
        if let Some(metric) = (rule.infer)(labels) {
            debug!(rule = rule.name, label = %metric.label, "metric inferred");
            return Some(metric);
        }
    }
    debug!(columns = labels.len(), "no metric rule matched");
    None
}

/// Convenience over [`infer_metric`] using the dataset's first-row schema.
pub fn infer_dataset_metric(dataset: &Dataset) -> Option<MetricDescriptor> {
    if dataset.is_empty() {
        return None;
    }
    infer_metric(&dataset.columns())
}

fn find_label<'a>(labels: &'a [String], pred: impl Fn(&str) -> bool) -> Option<&'a String> {
    labels.iter().find(|l| pred(&l.to_lowercase()))
}

fn contains_any(lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| lower.contains(*n))
}

fn direct(key: &str) -> MetricDescriptor {
    MetricDescriptor {
        source: MetricSource::Direct { key: key.to_string() },
        label: key.to_string(),
        is_percentage: true,
    }
}

fn sanction_percentage(labels: &[String]) -> Option<MetricDescriptor> {
    find_label(labels, |l| contains_any(l, &["sanction %", "sanction percentage"])).map(|k| direct(k))
}

fn completion_percentage(labels: &[String]) -> Option<MetricDescriptor> {
    find_label(labels, |l| contains_any(l, &["completion %", "completion against target"]))
        .map(|k| direct(k))
}

fn generic_percentage(labels: &[String]) -> Option<MetricDescriptor> {
    find_label(labels, |l| contains_any(l, &["(%)", "percentage", "%"])).map(|k| direct(k))
}

/// Denominator column: mentions "target" but is not an "achievement against target" column.
pub fn target_column(labels: &[String]) -> Option<&String> {
    find_label(labels, |l| l.contains("target") && !l.contains("achievement"))
}

/// Numerator column, resolved keyword by keyword rather than label by label.
pub fn done_column(labels: &[String]) -> Option<&String> {
    DONE_KEYWORDS
        .iter()
        .find_map(|kw| find_label(labels, |l| l.contains(*kw)))
}

fn ratio_label(done_key: &str) -> &'static str {
    let lower = done_key.to_lowercase();
    if lower.contains("sanction") {
        "Sanction %"
    } else if lower.contains("registration") {
        "Registration %"
    } else if lower.contains("completed") {
        "Completion %"
    } else {
        "Achievement %"
    }
}

fn target_done_ratio(labels: &[String]) -> Option<MetricDescriptor> {
    let target = target_column(labels)?;
    let done = done_column(labels)?;
    Some(MetricDescriptor {
        source: MetricSource::Calculated {
            target_key: target.clone(),
            done_key: done.clone(),
        },
        label: ratio_label(done).to_string(),
        is_percentage: true,
    })
}

fn count_column(labels: &[String]) -> Option<MetricDescriptor> {
    let key = done_column(labels)
        .or_else(|| target_column(labels))
        .or_else(|| find_label(labels, |l| contains_any(l, &COUNT_KEYWORDS)))?;
    Some(MetricDescriptor {
        source: MetricSource::Count { key: key.clone() },
        label: key.clone(),
        is_percentage: false,
    })
}

impl MetricDescriptor {
    /// The metric for a single row, `None` when the cells do not parse or a
    /// ratio has a zero target.
    pub fn value(&self, row: &Row) -> Option<f64> {
        match &self.source {
            MetricSource::Direct { key } | MetricSource::Count { key } => parse_cell(row.get(key)),
            MetricSource::Calculated { target_key, done_key } => {
                let target = parse_cell(row.get(target_key))?;
                let done = parse_cell(row.get(done_key))?;
                if target == 0.0 {
                    None
                } else {
                    Some(done / target * 100.0)
                }
            }
        }
    }

    /// The value a row is ranked by. Blank or unreadable cells count as 0 so
    /// units that reported nothing sort first; only a ratio with a zero
    /// target is left out.
    pub fn rank_value(&self, row: &Row) -> Option<f64> {
        match &self.source {
            MetricSource::Direct { key } | MetricSource::Count { key } => Some(cell_or_zero(row.get(key))),
            MetricSource::Calculated { target_key, done_key } => {
                let target = cell_or_zero(row.get(target_key));
                if target == 0.0 {
                    return None;
                }
                Some(cell_or_zero(row.get(done_key)) / target * 100.0)
            }
        }
    }

    pub fn target_key(&self) -> Option<&str> {
        match &self.source {
            MetricSource::Calculated { target_key, .. } => Some(target_key),
            _ => None,
        }
    }

    pub fn done_key(&self) -> Option<&str> {
        match &self.source {
            MetricSource::Calculated { done_key, .. } => Some(done_key),
            _ => None,
        }
    }
}
