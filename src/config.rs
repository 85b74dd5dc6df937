//! Per-load configuration: what to print, what to export, plugin options.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::export::ExportConfig;
use crate::options::PluginOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Invalid config {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub all:             bool,
    pub silent:          bool,
    pub prolog:          bool,
    pub energy_use:      bool,
    pub dynamic_results: bool,
    pub epilog:          bool,
    pub verbose:         bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub display:        DisplayOptions,
    pub export:         ExportConfig,
    pub plugin_options: PluginOptions,
}

impl LoadConfig {
    /// Nothing printed, nothing exported.
    pub fn silent() -> Self {
        let mut c = Self::default();
        c.display.silent = true;
        c
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    /// Apply the request defaults: with no section printed and no CSV
    /// requested, everything is printed unless `silent`.  `silent` turns
    /// off all section printing and verbose output.
    pub fn normalized(&self) -> Self {
        let mut c = self.clone();
        let d = &mut c.display;
        let nothing_requested = !(d.prolog || d.energy_use || d.dynamic_results || d.epilog)
            && c.export.is_empty();
        if nothing_requested && !d.silent {
            d.all = true;
        }
        if d.silent {
            d.all             = false;
            d.prolog          = false;
            d.energy_use      = false;
            d.dynamic_results = false;
            d.epilog          = false;
            d.verbose         = false;
        }
        c
    }

    pub fn print_prolog(&self) -> bool { self.display.all || self.display.prolog }
    pub fn print_energy_use(&self) -> bool { self.display.all || self.display.energy_use }
    pub fn print_dynamic_results(&self) -> bool { self.display.all || self.display.dynamic_results }
    pub fn print_epilog(&self) -> bool { self.display.all || self.display.epilog }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportKey;
    use std::io::Write;

    #[test]
    fn empty_request_implies_all() {
        let c = LoadConfig::default().normalized();
        assert!(c.display.all);
        assert!(c.print_prolog() && c.print_epilog());
    }

    #[test]
    fn export_only_prints_nothing() {
        let mut c = LoadConfig::default();
        c.export.set(ExportKey::DynamicNodeCsv, "out.csv");
        let c = c.normalized();
        assert!(!c.display.all);
        assert!(!c.print_dynamic_results());
    }

    #[test]
    fn silent_wins() {
        let mut c = LoadConfig::silent();
        c.display.prolog = true;
        c.display.verbose = true;
        let c = c.normalized();
        assert!(!c.print_prolog());
        assert!(!c.display.verbose);
        assert!(!c.display.all);
    }

    #[test]
    fn loads_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"display": {{"epilog": true}},
                "export": {{"dynamic_link_csv": "links.csv"}},
                "plugin_options": {{"summary_info": true}}}}"#
        ).unwrap();
        let c = LoadConfig::from_json_file(f.path()).unwrap();
        assert!(c.display.epilog);
        assert_eq!(c.export.get(ExportKey::DynamicLinkCsv), Some(Path::new("links.csv")));
        assert!(c.plugin_options.flag("summary_info"));
    }
}
