//! `summary` plugin: file layout check and network statistics.
//!
//! Options (all flags):
//!
//! | Option                          | Effect                                          |
//! |---------------------------------|-------------------------------------------------|
//! | `summary_info`                  | section sizes against the actual file size      |
//! | `summary_prolog_info`           | average node elevation and link length          |
//! | `summary_dynamic_results_info`  | node pressure / link velocity extremes          |
//! | `summary_verbose`               | trace every callback                            |
//! | `summary_all`                   | all of the above                                |

use std::io::Write;

use crate::model::PeriodResult;
use crate::options::{OptionError, OptionScope};
use crate::plugin::{Context, Plugin, PluginError, PluginResult};
use crate::section::SectionSizes;

const PREFIX: &str = "SUMMARY:";

/// Smallest and largest value seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub min: f32,
    pub max: f32,
}

impl Extremes {
    /// `None` for an empty slice.
    pub fn of(values: &[f32]) -> Option<Self> {
        let mut it = values.iter().copied();
        let first = it.next()?;
        Some(it.fold(Extremes { min: first, max: first }, |e, v| e.merge(Extremes { min: v, max: v })))
    }

    pub fn merge(self, other: Extremes) -> Self {
        Extremes { min: self.min.min(other.min), max: self.max.max(other.max) }
    }
}

/// Per-period pressure and velocity extremes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodStats {
    pub pressure: Option<Extremes>,
    pub velocity: Option<Extremes>,
}

impl PeriodStats {
    pub fn of(period: &PeriodResult) -> Self {
        Self {
            pressure: Extremes::of(&period.node_pressure),
            velocity: Extremes::of(&period.link_velocity),
        }
    }
}

fn merge(a: Option<Extremes>, b: Option<Extremes>) -> Option<Extremes> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merge(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn mean(values: impl ExactSizeIterator<Item = f32>) -> Option<f64> {
    let n = values.len();
    (n > 0).then(|| values.map(f64::from).sum::<f64>() / n as f64)
}

fn show(e: Option<Extremes>, what: &str) -> String {
    match e {
        Some(e) => format!("Minimum {what} {:.6}, Maximum {what} {:.6}", e.min, e.max),
        None    => format!("No {what} values"),
    }
}

fn declare_options(o: &mut OptionScope<'_>) -> Result<(), OptionError> {
    o.flag("summary_info", "display section sizes and check them against the file size")?;
    o.flag("summary_prolog_info", "display average node elevation and link length")?;
    o.flag("summary_dynamic_results_info", "display node pressure and link velocity extremes")?;
    o.flag("summary_verbose", "display summary plugin messages")?;
    o.flag("summary_all", "display all summary plugin info")
}

#[derive(Debug, Default)]
pub struct SummaryPlugin {
    info:                 bool,
    prolog_info:          bool,
    dynamic_results_info: bool,
    verbose:              bool,

    avg_elevation:   Option<f64>,
    avg_link_length: Option<f64>,
    periods:         Vec<PeriodStats>,
    overall:         PeriodStats,
}

impl SummaryPlugin {
    pub fn new() -> Self { Self::default() }

    /// Statistics gathered during the last load.
    pub fn period_stats(&self) -> &[PeriodStats] { &self.periods }
    pub fn overall(&self) -> PeriodStats { self.overall }
    pub fn average_elevation(&self) -> Option<f64> { self.avg_elevation }
    pub fn average_link_length(&self) -> Option<f64> { self.avg_link_length }

    fn trace(&self, cx: &mut Context<'_>, callback: &str) -> PluginResult {
        if self.verbose {
            writeln!(cx.out(), "{PREFIX} SummaryPlugin:{callback}()")?;
        }
        Ok(())
    }

    fn write_sizes(&self, cx: &mut Context<'_>) -> PluginResult {
        let model = cx.model();
        let p = model.prolog().ok_or(PluginError::MissingSection("Prolog"))?;
        let periods = model.trailer().map_or(0, |t| t.period_count);
        let actual = model.source().map(|s| s.size);
        let (nodes, links, tanks, pumps) =
            (p.node_count(), p.link_count(), p.tank_reservoir_count(), p.pump_count());
        let sizes = SectionSizes::compute(nodes, links, tanks, pumps, periods);
        let total = sizes.total();
        let pct = |n: u64| n as f64 * 100.0 / total as f64;

        let mut lines = vec![
            format!("{PREFIX} File section size definitions:"),
            format!("{PREFIX}   Prolog size: 884 + 36*Nnodes + 52*Nlinks + 8*Ntanks"),
            format!("{PREFIX}   Energy use size: 28*Npumps + 4"),
            format!("{PREFIX}   Dynamic results size: (16*Nnodes + 32*Nlinks)*Nperiods"),
            format!("{PREFIX}   Epilog size: 28"),
            format!("{PREFIX} Network data:"),
            format!("{PREFIX}   Nnodes={nodes}"),
            format!("{PREFIX}   Ntanks={tanks} (actually reservoirs and tanks)"),
            format!("{PREFIX}   Nlinks={links}"),
            format!("{PREFIX}   Npumps={pumps}"),
            format!("{PREFIX}   Nperiods={periods}"),
            format!("{PREFIX} Calculated file section sizes:"),
            format!(
                "{PREFIX}   Prolog size: 884 + 36*{nodes} + 52*{links} + 8*{tanks} = {} ({:.2}%)",
                sizes.prolog, pct(sizes.prolog),
            ),
            format!(
                "{PREFIX}   Energy use size: 28*{pumps} + 4 = {} ({:.2}%)",
                sizes.energy_use, pct(sizes.energy_use),
            ),
            format!(
                "{PREFIX}   Dynamic results size: (16*{nodes} + 32*{links})*{periods} = {} ({:.2}%)",
                sizes.dynamic_results, pct(sizes.dynamic_results),
            ),
            format!("{PREFIX}   Epilog size: 28 ({:.2}%)", pct(sizes.epilog)),
            format!("{PREFIX} Total file size: {total}"),
        ];
        lines.push(match actual {
            Some(a) if a == total => format!("{PREFIX} Actual file size matches calculated file size"),
            Some(a) => format!(
                "{PREFIX} ERROR actual file size ({a}) does not match calculated file size ({total})"
            ),
            None => format!("{PREFIX} Actual file size unknown"),
        });

        let out = cx.out();
        for line in lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

impl Plugin for SummaryPlugin {
    fn name(&self) -> &str { "summary" }

    fn on_init(&mut self, options: &mut OptionScope<'_>) -> PluginResult {
        declare_options(options).map_err(|e| PluginError::Failed(e.to_string()))
    }

    fn on_test(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "Test")
    }

    fn on_file_init(&mut self, cx: &mut Context<'_>) -> PluginResult {
        let opts = &cx.config().plugin_options;
        let all = opts.flag("summary_all");
        self.info                 = all || opts.flag("summary_info");
        self.prolog_info          = all || opts.flag("summary_prolog_info");
        self.dynamic_results_info = all || opts.flag("summary_dynamic_results_info");
        self.verbose              = all || opts.flag("summary_verbose");

        self.avg_elevation   = None;
        self.avg_link_length = None;
        self.periods.clear();
        self.overall = PeriodStats::default();

        self.trace(cx, "FileInit")?;
        if self.info {
            if let Some(src) = cx.model().source() {
                let line = format!("{PREFIX} File {}, size {}", src.path.display(), src.size);
                writeln!(cx.out(), "{line}")?;
            }
        }
        Ok(())
    }

    fn on_file_open(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "FileOpen")
    }

    fn on_prolog_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "PrologRead")?;
        if self.prolog_info {
            let p = cx.model().prolog().ok_or(PluginError::MissingSection("Prolog"))?;
            self.avg_elevation   = mean(p.nodes.iter().map(|n| n.elevation));
            self.avg_link_length = mean(p.links.iter().map(|l| l.length));
        }
        Ok(())
    }

    fn on_prolog_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "PrologPrint")?;
        if self.info {
            self.write_sizes(cx)?;
        }
        if self.prolog_info {
            let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.6}"));
            let out = cx.out();
            writeln!(out, "{PREFIX} Node elevation Average={}", fmt(self.avg_elevation))?;
            writeln!(out, "{PREFIX} Link length Average={}", fmt(self.avg_link_length))?;
        }
        Ok(())
    }

    fn on_prolog_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "PrologExport")
    }

    fn on_energy_use_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "EnergyUseRead")
    }

    fn on_energy_use_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "EnergyUsePrint")
    }

    fn on_energy_use_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "EnergyUseExport")
    }

    fn on_dynamic_results_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "DynamicResultsRead")?;
        if self.dynamic_results_info {
            let periods = cx.model().dynamic_results().ok_or(PluginError::MissingSection("DynamicResults"))?;
            self.periods = periods.iter().map(PeriodStats::of).collect();
            self.overall = self.periods.iter().fold(PeriodStats::default(), |acc, s| PeriodStats {
                pressure: merge(acc.pressure, s.pressure),
                velocity: merge(acc.velocity, s.velocity),
            });
        }
        Ok(())
    }

    fn on_dynamic_results_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "DynamicResultsPrint")?;
        if self.dynamic_results_info {
            let out = cx.out();
            for (i, s) in self.periods.iter().enumerate() {
                writeln!(out, "{PREFIX} TimeStep {i}")?;
                writeln!(out, "{PREFIX}   {}", show(s.pressure, "node pressure"))?;
                writeln!(out, "{PREFIX}   {}", show(s.velocity, "link velocity"))?;
            }
            writeln!(out, "{PREFIX} Overall min/max")?;
            writeln!(out, "{PREFIX}   {}", show(self.overall.pressure, "node pressure"))?;
            writeln!(out, "{PREFIX}   {}", show(self.overall.velocity, "link velocity"))?;
        }
        Ok(())
    }

    fn on_dynamic_results_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "DynamicResultsExport")
    }

    fn on_epilog_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "EpilogRead")
    }

    fn on_epilog_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "EpilogPrint")
    }

    fn on_epilog_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "EpilogExport")
    }

    fn on_file_close(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "FileClose")
    }

    fn on_file_term(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.trace(cx, "FileTerm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::test_support::pumped;

    #[test]
    fn extremes_of_values() {
        assert_eq!(Extremes::of(&[]), None);
        assert_eq!(Extremes::of(&[3.0, -1.0, 2.0]), Some(Extremes { min: -1.0, max: 3.0 }));
    }

    #[test]
    fn period_stats_and_overall_merge() {
        let s = pumped();
        let stats: Vec<_> = s.periods.iter().map(PeriodStats::of).collect();
        assert_eq!(stats[0].pressure, Some(Extremes { min: 0.0, max: 39.0 }));
        assert_eq!(stats[1].velocity, Some(Extremes { min: 0.0, max: 3.0 }));
        let overall = merge(stats[0].pressure, stats[1].pressure);
        assert_eq!(overall, Some(Extremes { min: 0.0, max: 40.0 }));
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(std::iter::empty::<f32>()), None);
        assert_eq!(mean([10.0f32, 12.0, 30.0, 0.0].into_iter()), Some(13.0));
    }

    #[test]
    fn declares_prefixed_options() {
        let mut reg = crate::options::OptionRegistry::new();
        SummaryPlugin::new().on_init(&mut reg.scope("summary")).unwrap();
        assert_eq!(reg.specs().len(), 5);
        assert!(reg.specs().iter().all(|s| s.name.starts_with("summary_")));
    }
}
