// Shared data types: sheet rows, metric descriptors, aggregate results,
// briefs, and the flat rows used for table display and export.
use crate::util::display_number;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// A raw spreadsheet cell. The CSV mapping layer hands us either text or an
/// already-numeric value; nothing here is trusted to be well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Number(n) => Cow::Owned(display_number(*n)),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

/// One monitored unit (usually a Gram Panchayat), keyed by column label.
///
/// Cells keep their source order so that "first matching label" rules stay
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form used by loaders and tests: `Row::new().with("Block", "Geedam")`.
    pub fn with(mut self, label: &str, value: impl Into<CellValue>) -> Self {
        self.push(label, value);
        self
    }

    /// Insert or overwrite a cell. A duplicate label keeps its original position.
    pub fn push(&mut self, label: &str, value: impl Into<CellValue>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(l, _)| l == label) {
            Some(slot) => slot.1 = value,
            None => self.cells.push((label.to_string(), value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }

    /// Trimmed text of a cell, `None` when the column is absent or blank.
    pub fn text(&self, label: &str) -> Option<String> {
        let raw = self.get(label)?.as_text();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(l, _)| l.as_str())
    }
}

/// Ordered rows of one scheme. The first row defines the column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.labels().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl From<Vec<Row>> for Dataset {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

/// Fetched rows per scheme name. A scheme whose fetch failed maps to an empty dataset.
pub type Datasets = BTreeMap<String, Dataset>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricKind {
    Direct,
    Calculated,
    Count,
}

/// Where a metric's numeric value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSource {
    /// Column already holds a percentage.
    Direct { key: String },
    /// `done / target * 100`, per row or summed across rows.
    Calculated { target_key: String, done_key: String },
    /// Raw magnitude, summed rather than averaged.
    Count { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub source: MetricSource,
    pub label: String,
    pub is_percentage: bool,
}

impl MetricDescriptor {
    pub fn kind(&self) -> MetricKind {
        match self.source {
            MetricSource::Direct { .. } => MetricKind::Direct,
            MetricSource::Calculated { .. } => MetricKind::Calculated,
            MetricSource::Count { .. } => MetricKind::Count,
        }
    }

    /// Unit suffix for rendered values.
    pub fn unit(&self) -> &'static str {
        if self.is_percentage {
            "%"
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityKeys {
    pub block_key: Option<String>,
    pub gp_key: Option<String>,
}

/// A headline number, or the "N/A" sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateValue {
    Number(f64),
    NotAvailable,
}

impl AggregateValue {
    pub fn number(&self) -> Option<f64> {
        match self {
            AggregateValue::Number(n) => Some(*n),
            AggregateValue::NotAvailable => None,
        }
    }
}

impl From<Option<f64>> for AggregateValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(AggregateValue::NotAvailable, AggregateValue::Number)
    }
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Number(n) => f.write_str(&display_number(*n)),
            AggregateValue::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for AggregateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AggregateValue::Number(n) => serializer.serialize_f64(*n),
            AggregateValue::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardStatus {
    Good,
    Moderate,
    Critical,
    Unknown,
}

/// District-level headline for one scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub value: AggregateValue,
    pub is_percentage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AggregateResult {
    pub fn not_available() -> Self {
        Self {
            value: AggregateValue::NotAvailable,
            is_percentage: false,
            label: None,
        }
    }

    /// Colour band used by the summary cards.
    pub fn status(&self) -> CardStatus {
        match (self.value, self.is_percentage) {
            (AggregateValue::Number(v), true) if v >= 75.0 => CardStatus::Good,
            (AggregateValue::Number(v), true) if v < 40.0 => CardStatus::Critical,
            (AggregateValue::Number(_), true) => CardStatus::Moderate,
            _ => CardStatus::Unknown,
        }
    }
}

/// One bar of the block drill-down.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAggregate {
    pub block: String,
    pub value: AggregateValue,
    pub rows: usize,
    pub is_district_total: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BriefLevel {
    Gp,
    Block,
}

impl fmt::Display for BriefLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BriefLevel::Gp => f.write_str("GP"),
            BriefLevel::Block => f.write_str("BLOCK"),
        }
    }
}

/// A GP placed in a bottom-N ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGp {
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<f64>,
}

/// Generated alert. Rebuilt on every pass, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Brief {
    #[serde(rename = "type")]
    pub level: BriefLevel,
    pub scheme: String,
    pub block: String,
    pub title: String,
    pub value: AggregateValue,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<RankedGp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub name: String,
    pub designation: String,
}

pub type Officers = BTreeMap<String, Officer>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeGroup {
    pub id: String,
    pub title: String,
    pub schemes: Vec<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SchemeSummaryRow {
    #[serde(rename = "Scheme")]
    #[tabled(rename = "Scheme")]
    pub scheme: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Type")]
    #[tabled(rename = "Type")]
    pub kind: String,
    #[serde(rename = "DistrictValue")]
    #[tabled(rename = "DistrictValue")]
    pub value: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BlockAggregateRow {
    #[serde(rename = "Block")]
    #[tabled(rename = "Block")]
    pub block: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Rows")]
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BriefRow {
    #[serde(rename = "Type")]
    #[tabled(rename = "Type")]
    pub level: String,
    #[serde(rename = "Scheme")]
    #[tabled(rename = "Scheme")]
    pub scheme: String,
    #[serde(rename = "Block")]
    #[tabled(rename = "Block")]
    pub block: String,
    #[serde(rename = "Title")]
    #[tabled(rename = "Title")]
    pub title: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

impl From<&Brief> for BriefRow {
    fn from(b: &Brief) -> Self {
        Self {
            level: b.level.to_string(),
            scheme: b.scheme.clone(),
            block: b.block.clone(),
            title: b.title.clone(),
            value: b.value.to_string(),
        }
    }
}
