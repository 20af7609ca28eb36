// District and block aggregation.
//
// A pre-computed "Total" row is trusted when it parses; otherwise unit rows
// are combined per metric kind: summed ratio, mean, or sum.
use crate::identity::{is_total_row, is_unit_row, resolve_identity_keys};
use crate::metric::infer_dataset_metric;
use crate::normalize::normalize_block_name;
use crate::types::{
    AggregateResult, AggregateValue, BlockAggregate, Dataset, IdentityKeys, MetricDescriptor,
    MetricSource, Row,
};
use crate::util::{cell_or_zero, parse_cell, round_half_up};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DISTRICT_TOTAL: &str = "District Total";

/// Running totals for one group of rows. What gets read back out depends on
/// the metric: weighted ratio, simple mean, or plain sum.
#[derive(Debug, Default, Clone)]
struct Acc {
    target: f64,
    done: f64,
    sum: f64,
    valid: usize,
    rows: usize,
}

impl Acc {
    fn add(&mut self, metric: &MetricDescriptor, row: &Row) {
        self.rows += 1;
        match &metric.source {
            MetricSource::Calculated { target_key, done_key } => {
                self.target += cell_or_zero(row.get(target_key));
                self.done += cell_or_zero(row.get(done_key));
            }
            MetricSource::Direct { key } => {
                if let Some(v) = parse_cell(row.get(key)) {
                    self.sum += v;
                    self.valid += 1;
                }
            }
            MetricSource::Count { key } => self.sum += cell_or_zero(row.get(key)),
        }
    }

    fn merge(&mut self, other: &Acc) {
        self.target += other.target;
        self.done += other.done;
        self.sum += other.sum;
        self.valid += other.valid;
        self.rows += other.rows;
    }

    fn value(&self, metric: &MetricDescriptor) -> Option<f64> {
        match metric.source {
            MetricSource::Calculated { .. } if self.target > 0.0 => {
                Some(round_half_up(self.done / self.target * 100.0))
            }
            MetricSource::Calculated { .. } => None,
            MetricSource::Direct { .. } if self.valid > 0 => {
                Some(round_half_up(self.sum / self.valid as f64))
            }
            MetricSource::Direct { .. } => None,
            MetricSource::Count { .. } => Some(round_half_up(self.sum)),
        }
    }
}

/// District headline for one scheme.
///
/// A numeric "Total" row in the block column is trusted as-is. Otherwise the
/// unit rows are combined: summed ratio for calculated metrics, mean of the
/// parsable values for direct percentages, sum for counts.
pub fn compute_district_aggregate(
    dataset: &Dataset,
    metric: &MetricDescriptor,
    keys: &IdentityKeys,
) -> AggregateResult {
    if dataset.is_empty() {
        return AggregateResult::not_available();
    }

    let sentinel = dataset
        .rows()
        .iter()
        .filter(|r| is_total_row(r, keys))
        .find_map(|r| metric.value(r));
    if let Some(v) = sentinel {
        return AggregateResult {
            value: AggregateValue::Number(round_half_up(v)),
            is_percentage: metric.is_percentage,
            label: Some(metric.label.clone()),
        };
    }

    let mut acc = Acc::default();
    for row in dataset.rows().iter().filter(|r| is_unit_row(r, keys)) {
        acc.add(metric, row);
    }
    match acc.value(metric) {
        Some(v) => AggregateResult {
            value: AggregateValue::Number(v),
            is_percentage: metric.is_percentage,
            label: Some(metric.label.clone()),
        },
        None => AggregateResult::not_available(),
    }
}

/// Infer metric and keys, then aggregate. `N/A` when no metric can be found.
pub fn district_summary(dataset: &Dataset) -> AggregateResult {
    let Some(metric) = infer_dataset_metric(dataset) else {
        return AggregateResult::not_available();
    };
    let keys = resolve_identity_keys(&dataset.columns());
    compute_district_aggregate(dataset, &metric, &keys)
}

/// Unit rows bucketed by normalized block name, in order of first appearance.
/// Rows without a block value are dropped. Empty when there is no block column.
pub fn group_by_block<'a>(dataset: &'a Dataset, keys: &IdentityKeys) -> Vec<(String, Vec<&'a Row>)> {
    let Some(block_key) = keys.block_key.as_deref() else {
        return Vec::new();
    };
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Row>)> = Vec::new();
    for row in dataset.rows().iter().filter(|r| is_unit_row(r, keys)) {
        let Some(raw) = row.text(block_key) else {
            continue;
        };
        let name = normalize_block_name(&raw);
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            groups.push((name, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }
    groups
}

fn aggregate_rows(metric: &MetricDescriptor, rows: &[&Row]) -> Acc {
    let mut acc = Acc::default();
    for row in rows {
        acc.add(metric, row);
    }
    acc
}

/// Aggregate of an arbitrary slice of unit rows (one block, typically).
pub fn aggregate_group(metric: &MetricDescriptor, rows: &[&Row]) -> AggregateValue {
    aggregate_rows(metric, rows).value(metric).into()
}

/// Aggregate of each block group, same combination rules as the district headline.
pub fn block_aggregates(
    dataset: &Dataset,
    metric: &MetricDescriptor,
    keys: &IdentityKeys,
) -> Vec<BlockAggregate> {
    group_by_block(dataset, keys)
        .into_iter()
        .map(|(block, rows)| BlockAggregate {
            block,
            value: aggregate_group(metric, &rows),
            rows: rows.len(),
            is_district_total: false,
        })
        .collect()
}

/// Drill-down bars: a synthesized District Total first, then blocks by
/// descending value (unavailable values last).
///
/// The District Total combines the underlying rows of every block rather than
/// averaging block results, so large and small blocks weigh by their size.
pub fn block_drilldown(
    dataset: &Dataset,
    metric: &MetricDescriptor,
    keys: &IdentityKeys,
) -> Vec<BlockAggregate> {
    let groups = group_by_block(dataset, keys);
    if groups.is_empty() {
        return Vec::new();
    }

    let mut district = Acc::default();
    let mut bars: Vec<BlockAggregate> = Vec::with_capacity(groups.len() + 1);
    for (block, rows) in groups {
        let acc = aggregate_rows(metric, &rows);
        district.merge(&acc);
        bars.push(BlockAggregate {
            block,
            value: acc.value(metric).into(),
            rows: acc.rows,
            is_district_total: false,
        });
    }

    bars.sort_by(|a, b| match (a.value.number(), b.value.number()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    bars.insert(
        0,
        BlockAggregate {
            block: DISTRICT_TOTAL.to_string(),
            value: district.value(metric).into(),
            rows: district.rows,
            is_district_total: true,
        },
    );
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::infer_metric;

    fn sanction_rows() -> Dataset {
        Dataset::new(vec![
            Row::new()
                .with("Block", "Dantewada")
                .with("GP", "A")
                .with("Target", 100.0)
                .with("Sanction Done", 40.0),
            Row::new()
                .with("Block", "Dantewada")
                .with("GP", "B")
                .with("Target", 50.0)
                .with("Sanction Done", 45.0),
            Row::new()
                .with("Block", "Geedam")
                .with("GP", "C")
                .with("Target", 200.0)
                .with("Sanction Done", 180.0),
        ])
    }

    fn setup(ds: &Dataset) -> (MetricDescriptor, IdentityKeys) {
        let cols = ds.columns();
        (infer_metric(&cols).unwrap(), resolve_identity_keys(&cols))
    }

    #[test]
    fn weighted_ratio_for_calculated_metric() {
        let ds = sanction_rows();
        let (m, k) = setup(&ds);
        let r = compute_district_aggregate(&ds, &m, &k);
        assert_eq!(r.value, AggregateValue::Number(76.0));
        assert!(r.is_percentage);
        assert_eq!(r.label.as_deref(), Some("Sanction %"));
    }

    #[test]
    fn drilldown_weights_district_total_by_rows() {
        let ds = sanction_rows();
        let (m, k) = setup(&ds);
        let bars = block_drilldown(&ds, &m, &k);
        let view: Vec<(&str, Option<f64>)> =
            bars.iter().map(|b| (b.block.as_str(), b.value.number())).collect();
        assert_eq!(
            view,
            vec![
                (DISTRICT_TOTAL, Some(76.0)),
                ("Geedam", Some(90.0)),
                ("Dantewada", Some(57.0)),
            ]
        );
        assert!(bars[0].is_district_total);
        assert_eq!(bars[0].rows, 3);
    }

    #[test]
    fn total_row_is_trusted() {
        let ds = Dataset::new(vec![
            Row::new().with("Block", "Geedam").with("Progress %", "10%"),
            Row::new().with("Block", "Total").with("Progress %", "63.6%"),
        ]);
        let (m, k) = setup(&ds);
        assert_eq!(compute_district_aggregate(&ds, &m, &k).value, AggregateValue::Number(64.0));
    }

    #[test]
    fn non_numeric_total_row_falls_back_to_mean() {
        let ds = Dataset::new(vec![
            Row::new().with("Block", "Geedam").with("Progress %", "10"),
            Row::new().with("Block", "Geedam").with("Progress %", "N/A"),
            Row::new().with("Block", "Geedam").with("Progress %", "21"),
            Row::new().with("Block", "Total").with("Progress %", "-"),
        ]);
        let (m, k) = setup(&ds);
        // N/A is left out of the denominator.
        assert_eq!(compute_district_aggregate(&ds, &m, &k).value, AggregateValue::Number(16.0));
    }

    #[test]
    fn zero_target_sum_is_not_available() {
        let ds = Dataset::new(vec![Row::new()
            .with("Block", "Geedam")
            .with("Target", 0.0)
            .with("Completed", 4.0)]);
        let (m, k) = setup(&ds);
        assert_eq!(compute_district_aggregate(&ds, &m, &k), AggregateResult::not_available());
    }

    #[test]
    fn count_metric_sums_and_ignores_totals() {
        let ds = Dataset::new(vec![
            Row::new().with("Block", "Geedam").with("No. of Works", 3.0),
            Row::new().with("Block", "Geedam").with("No. of Works", ""),
            Row::new().with("Block", "Dantewada").with("No. of Works", "4"),
            Row::new().with("Block", "District Total").with("No. of Works", "x"),
        ]);
        let (m, k) = setup(&ds);
        let r = compute_district_aggregate(&ds, &m, &k);
        assert_eq!(r.value, AggregateValue::Number(7.0));
        assert!(!r.is_percentage);
        assert_eq!(r.label.as_deref(), Some("No. of Works"));
    }

    #[test]
    fn empty_dataset_is_not_available() {
        assert_eq!(district_summary(&Dataset::default()), AggregateResult::not_available());
    }

    #[test]
    fn block_groups_merge_aliases_and_skip_summary_lines() {
        let ds = Dataset::new(vec![
            Row::new().with("Block", "kuakonda").with("Works", 1.0),
            Row::new().with("Block", "Kuwakonda").with("Works", 2.0),
            Row::new().with("Block", "").with("Works", 9.0),
            Row::new().with("Block", "Total").with("Works", 3.0),
        ]);
        let (m, k) = setup(&ds);
        let blocks = block_aggregates(&ds, &m, &k);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block, "Kuwakonda");
        assert_eq!(blocks[0].value, AggregateValue::Number(3.0));
    }

    #[test]
    fn count_drilldown_district_total_is_sum_of_blocks() {
        let ds = Dataset::new(vec![
            Row::new().with("Block", "Geedam").with("GP", "A").with("No. of Works", 3.0),
            Row::new().with("Block", "Dantewada").with("GP", "B").with("No. of Works", "12"),
            Row::new().with("Block", "gidam").with("GP", "C").with("No. of Works", "4"),
            Row::new().with("Block", "Katekalyan").with("GP", "D").with("No. of Works", "N/A"),
        ]);
        let (m, k) = setup(&ds);
        let bars = block_drilldown(&ds, &m, &k);
        let view: Vec<(&str, Option<f64>)> =
            bars.iter().map(|b| (b.block.as_str(), b.value.number())).collect();
        assert_eq!(
            view,
            vec![
                (DISTRICT_TOTAL, Some(19.0)),
                ("Dantewada", Some(12.0)),
                ("Geedam", Some(7.0)),
                ("Katekalyan", Some(0.0)),
            ]
        );
        let block_sum: f64 = bars[1..].iter().filter_map(|b| b.value.number()).sum();
        assert_eq!(bars[0].value.number(), Some(block_sum));
    }

    #[test]
    fn drilldown_without_block_column_is_empty() {
        let ds = Dataset::new(vec![Row::new().with("GP", "A").with("Works", 1.0)]);
        let (m, k) = setup(&ds);
        assert!(block_drilldown(&ds, &m, &k).is_empty());
    }
}
