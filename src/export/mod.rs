//! CSV export of decoded sections.
//!
//! An [`ExportConfig`] maps fixed keys to destination paths.  A key that is
//! present gets its CSV written once its section has been decoded; absent
//! keys are skipped.  Column order and header text are fixed per key.
//!
//! Fields are separated by `", "`, strings are double-quoted and floats are
//! printed with six decimals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{EnergyUse, PeriodResult, Prolog, ResultModel};
use crate::section::Section;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot write {path}: {source}")]
    File { path: PathBuf, source: io::Error },
    #[error("CSV write failed: {0}")]
    Io(#[from] io::Error),
    #[error("{0} section has not been decoded")]
    MissingSection(&'static str),
    #[error("{what} index {index} out of range (0..{len})")]
    IndexOutOfRange { what: &'static str, index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKey {
    PrologNodeCsv,
    PrologLinkCsv,
    EnergyUseCsv,
    DynamicNodeCsv,
    DynamicLinkCsv,
}

impl ExportKey {
    pub const ALL: [ExportKey; 5] = [
        ExportKey::PrologNodeCsv,
        ExportKey::PrologLinkCsv,
        ExportKey::EnergyUseCsv,
        ExportKey::DynamicNodeCsv,
        ExportKey::DynamicLinkCsv,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportKey::PrologNodeCsv  => "prolog_node_csv",
            ExportKey::PrologLinkCsv  => "prolog_link_csv",
            ExportKey::EnergyUseCsv   => "energy_use_csv",
            ExportKey::DynamicNodeCsv => "dynamic_node_csv",
            ExportKey::DynamicLinkCsv => "dynamic_link_csv",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Section whose data the CSV is built from.
    pub fn section(self) -> Section {
        match self {
            ExportKey::PrologNodeCsv | ExportKey::PrologLinkCsv   => Section::Prolog,
            ExportKey::EnergyUseCsv                               => Section::EnergyUse,
            ExportKey::DynamicNodeCsv | ExportKey::DynamicLinkCsv => Section::DynamicResults,
        }
    }

    /// Text shown when the CSV is written.
    pub fn description(self) -> &'static str {
        match self {
            ExportKey::PrologNodeCsv  => "prolog node info",
            ExportKey::PrologLinkCsv  => "prolog link info",
            ExportKey::EnergyUseCsv   => "energy usage",
            ExportKey::DynamicNodeCsv => "dynamic results for nodes",
            ExportKey::DynamicLinkCsv => "dynamic results for links",
        }
    }
}

impl std::fmt::Display for ExportKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportConfig(BTreeMap<ExportKey, PathBuf>);

impl ExportConfig {
    pub fn set(&mut self, key: ExportKey, path: impl Into<PathBuf>) {
        self.0.insert(key, path.into());
    }

    pub fn get(&self, key: ExportKey) -> Option<&Path> {
        self.0.get(&key).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (ExportKey, &Path)> {
        self.0.iter().map(|(k, p)| (*k, p.as_path()))
    }

    /// Configured outputs built from `section`, in key order.
    pub fn for_section(&self, section: Section) -> impl Iterator<Item = (ExportKey, &Path)> {
        self.iter().filter(move |(k, _)| k.section() == section)
    }
}

/// Write the CSV for `key` from `model` to `path`.
pub fn export_to_path(key: ExportKey, model: &ResultModel, path: &Path) -> Result<(), ExportError> {
    let file_err = |source| ExportError::File { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(file_err)?;
    let mut w = BufWriter::new(file);
    export_to_writer(key, model, &mut w).map_err(|e| match e {
        ExportError::Io(source) => file_err(source),
        other => other,
    })?;
    w.flush().map_err(file_err)
}

/// Write the CSV for `key` from `model` to `w`.
pub fn export_to_writer<W: Write>(key: ExportKey, model: &ResultModel, w: &mut W) -> Result<(), ExportError> {
    let prolog = model.prolog().ok_or(ExportError::MissingSection("Prolog"))?;
    match key {
        ExportKey::PrologNodeCsv => write_prolog_node_csv(w, prolog),
        ExportKey::PrologLinkCsv => write_prolog_link_csv(w, prolog),
        ExportKey::EnergyUseCsv => {
            let energy = model.energy_use().ok_or(ExportError::MissingSection("EnergyUse"))?;
            write_energy_use_csv(w, prolog, energy)
        }
        ExportKey::DynamicNodeCsv => {
            let periods = model.dynamic_results().ok_or(ExportError::MissingSection("DynamicResults"))?;
            write_dynamic_node_csv(w, prolog, periods)
        }
        ExportKey::DynamicLinkCsv => {
            let periods = model.dynamic_results().ok_or(ExportError::MissingSection("DynamicResults"))?;
            write_dynamic_link_csv(w, prolog, periods)
        }
    }
}

// ── Per-key writers ──────────────────────────────────────────────────────────

fn node_id(prolog: &Prolog, index: usize) -> Result<&str, ExportError> {
    prolog.nodes.get(index)
        .map(|n| n.id.as_str())
        .ok_or(ExportError::IndexOutOfRange { what: "node", index, len: prolog.node_count() })
}

fn write_prolog_node_csv<W: Write>(w: &mut W, prolog: &Prolog) -> Result<(), ExportError> {
    writeln!(w, "\"ID\", \"Type\", \"Elevation\", \"XSectArea\"")?;
    for (i, node) in prolog.nodes.iter().enumerate() {
        writeln!(
            w, "\"{}\", \"{}\", {:.6}, {:.6}",
            node.id, prolog.node_kind(i).label(), node.elevation, prolog.node_area(i),
        )?;
    }
    Ok(())
}

fn write_prolog_link_csv<W: Write>(w: &mut W, prolog: &Prolog) -> Result<(), ExportError> {
    writeln!(w, "\"ID\", \"StartNodeID\", \"EndNodeID\", \"Type\", \"Length\", \"Diameter\"")?;
    for link in &prolog.links {
        writeln!(
            w, "\"{}\", \"{}\", \"{}\", \"{}\", {:.6}, {:.6}",
            link.id, node_id(prolog, link.start)?, node_id(prolog, link.end)?,
            link.kind.label(), link.length, link.diameter,
        )?;
    }
    Ok(())
}

fn write_energy_use_csv<W: Write>(w: &mut W, prolog: &Prolog, energy: &EnergyUse) -> Result<(), ExportError> {
    writeln!(
        w,
        "\"ID\", \"PumpUtilization\", \"PumpAveEfficiency\", \"PumpAvekWPerVol\", \
         \"PumpAvekW\", \"PumpPeakkW\", \"PumpAveCostPerDay\"",
    )?;
    for pump in &energy.pumps {
        let link = prolog.links.get(pump.link)
            .ok_or(ExportError::IndexOutOfRange { what: "pump link", index: pump.link, len: prolog.link_count() })?;
        writeln!(
            w, "\"{}\", {:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}",
            link.id, pump.utilization, pump.average_efficiency, pump.average_kw_per_volume,
            pump.average_kw, pump.peak_kw, pump.average_cost_per_day,
        )?;
    }
    Ok(())
}

fn write_dynamic_node_csv<W: Write>(w: &mut W, prolog: &Prolog, periods: &[PeriodResult]) -> Result<(), ExportError> {
    writeln!(
        w,
        "\"TimeStep\",\"Time (sec)\",\"ID\", \"Demand\", \"Head\", \"Pressure ({})\", \"WaterQuality ({})\"",
        prolog.header.pressure_units, prolog.header.water_quality,
    )?;
    for (i, period) in periods.iter().enumerate() {
        let time = prolog.period_time(i);
        for (j, node) in prolog.nodes.iter().enumerate() {
            writeln!(
                w, "{}, {}, \"{}\", {:.6}, {:.6}, {:.6}, {:.6}",
                i, time, node.id,
                value(&period.node_demand, j), value(&period.node_head, j),
                value(&period.node_pressure, j), value(&period.node_water_quality, j),
            )?;
        }
    }
    Ok(())
}

fn write_dynamic_link_csv<W: Write>(w: &mut W, prolog: &Prolog, periods: &[PeriodResult]) -> Result<(), ExportError> {
    writeln!(
        w,
        "\"TimeStep\",\"Time (sec)\",\"ID\", \"Flow ({})\", \"Velocity\", \"Headloss\", \
         \"AverageWaterQuality ({})\", \"Status\", \"ReactionRate\", \"FrictionFactor\"",
        prolog.header.flow_units, prolog.header.water_quality,
    )?;
    for (i, period) in periods.iter().enumerate() {
        let time = prolog.period_time(i);
        for (j, link) in prolog.links.iter().enumerate() {
            writeln!(
                w, "{}, {}, \"{}\", {:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}",
                i, time, link.id,
                value(&period.link_flow, j), value(&period.link_velocity, j),
                value(&period.link_headloss, j), value(&period.link_avg_water_quality, j),
                value(&period.link_status, j), value(&period.link_reaction_rate, j),
                value(&period.link_friction_factor, j),
            )?;
        }
    }
    Ok(())
}

// Decoded periods always match the prolog's counts.
fn value(values: &[f32], index: usize) -> f32 {
    values.get(index).copied().unwrap_or(f32::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::test_support::{pumped, sample};

    fn model_of(s: crate::writer::test_support::Sample) -> ResultModel {
        let mut m = ResultModel::default();
        m.set_prolog(s.prolog);
        m.set_energy_use(s.energy_use);
        m.set_dynamic_results(s.periods);
        m.set_epilog(s.epilog);
        m
    }

    fn csv(key: ExportKey, model: &ResultModel) -> String {
        let mut out = Vec::new();
        export_to_writer(key, model, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn dynamic_node_rows_per_period_and_node() {
        let text = csv(ExportKey::DynamicNodeCsv, &model_of(sample()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\"TimeStep\",\"Time (sec)\",\"ID\""));
        assert!(lines[0].contains("Pressure (pounds/square inch)"));
        assert_eq!(lines[1], "0, 0, \"J1\", 1.000000, 50.000000, 40.000000, 0.200000");
        assert!(lines[2].starts_with("0, 0, \"R1\", 0.000000"));
    }

    #[test]
    fn prolog_csvs_name_kinds_and_endpoints() {
        let model = model_of(pumped());
        let nodes = csv(ExportKey::PrologNodeCsv, &model);
        assert!(nodes.contains("\"T1\", \"Tank\", "));
        assert!(nodes.contains("\"R1\", \"Reservoir\", "));
        assert!(nodes.contains("\"J1\", \"Junction\", "));

        let links = csv(ExportKey::PrologLinkCsv, &model);
        assert!(links.contains("\"PU1\", \"R1\", \"J1\", \"Pump\", "));
    }

    #[test]
    fn energy_csv_uses_pump_link_ids() {
        let text = csv(ExportKey::EnergyUseCsv, &model_of(pumped()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("\"PU1\", "));
    }

    #[test]
    fn missing_section_is_reported() {
        let err = export_to_writer(ExportKey::DynamicLinkCsv, &ResultModel::default(), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingSection("Prolog")));
    }

    #[test]
    fn keys_round_trip_by_name_and_section() {
        for key in ExportKey::ALL {
            assert_eq!(ExportKey::from_name(key.name()), Some(key));
        }
        let mut cfg = ExportConfig::default();
        cfg.set(ExportKey::DynamicLinkCsv, "l.csv");
        cfg.set(ExportKey::PrologNodeCsv, "n.csv");
        cfg.set(ExportKey::DynamicNodeCsv, "d.csv");
        let keys: Vec<_> = cfg.for_section(Section::DynamicResults).map(|(k, _)| k).collect();
        assert_eq!(keys, vec![ExportKey::DynamicNodeCsv, ExportKey::DynamicLinkCsv]);
    }
}
