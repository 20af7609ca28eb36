// Dashboard configuration: schemes, nodal officers, sheet locations and
// report groups, read from JSON with built-in defaults.
use crate::error::{DashboardError, Result};
use crate::types::{Officer, Officers, SchemeGroup};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_GROUP_ID: &str = "default_group";
const DEFAULT_GROUP_TITLE: &str = "General Schemes";

static DEFAULT_CONFIG: Lazy<DashboardConfig> = Lazy::new(|| {
    let officers = [
        ("MNREGA", "Mr. Rajesh Sharma", "Project Officer"),
        ("Swachh Bharat Mission (SBM)", "Ms. Priya Singh", "District Consultant"),
        ("Pradhan Mantri Awas Yojana (PMAY)", "Mr. Amit Verma", "Housing Coordinator"),
        ("National Rural Livelihood Mission (NRLM)", "Ms. Sunita Gupta", "District Manager"),
    ];
    let schemes: Vec<String> = officers.iter().map(|(s, _, _)| s.to_string()).collect();
    DashboardConfig {
        nodal_officers: officers
            .iter()
            .map(|(s, name, designation)| {
                let officer = Officer { name: name.to_string(), designation: designation.to_string() };
                (s.to_string(), officer)
            })
            .collect(),
        sheet_paths: BTreeMap::new(),
        scheme_groups: vec![SchemeGroup {
            id: DEFAULT_GROUP_ID.to_string(),
            title: DEFAULT_GROUP_TITLE.to_string(),
            schemes: schemes.clone(),
        }],
        schemes,
        headline_marker: '*',
        base_dir: None,
    }
});

/// Schemes, officers, sheet locations and display groups. Missing JSON
/// fields take the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    pub schemes: Vec<String>,
    pub nodal_officers: Officers,
    /// Local CSV export per scheme. Relative paths resolve against the config file.
    pub sheet_paths: BTreeMap<String, String>,
    /// Left empty when omitted so [`DashboardConfig::groups`] covers the configured schemes.
    #[serde(default)]
    pub scheme_groups: Vec<SchemeGroup>,
    /// Marks the column tracked day over day.
    pub headline_marker: char,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let mut config: DashboardConfig = serde_json::from_str(&s)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;
        debug!(path = %path.display(), schemes = config.schemes.len(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for scheme in &self.schemes {
            if !seen.insert(scheme.as_str()) {
                return Err(DashboardError::Config(format!("scheme '{scheme}' listed twice")));
            }
        }
        if self.headline_marker.is_whitespace() {
            return Err(DashboardError::Config("headline marker must be visible".to_string()));
        }
        Ok(())
    }

    pub fn active_schemes(&self) -> &[String] {
        &self.schemes
    }

    pub fn require_scheme(&self, name: &str) -> Result<&String> {
        self.schemes
            .iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| DashboardError::UnknownScheme(name.to_string()))
    }

    /// Sheet path for a scheme, `None` when unset or blank.
    pub fn sheet_path(&self, scheme: &str) -> Option<PathBuf> {
        let raw = self.sheet_paths.get(scheme)?.trim();
        if raw.is_empty() {
            return None;
        }
        let p = PathBuf::from(raw);
        match &self.base_dir {
            Some(base) if p.is_relative() => Some(base.join(p)),
            _ => Some(p),
        }
    }

    /// Display groups; one group of every scheme when none are configured.
    pub fn groups(&self) -> Vec<SchemeGroup> {
        if !self.scheme_groups.is_empty() {
            return self.scheme_groups.clone();
        }
        vec![SchemeGroup {
            id: DEFAULT_GROUP_ID.to_string(),
            title: DEFAULT_GROUP_TITLE.to_string(),
            schemes: self.schemes.clone(),
        }]
    }
}
