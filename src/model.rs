//! In-memory form of a decoded output file.
//!
//! The file has four sections, each decoded into its own record:
//!
//! | Section          | Record                 |
//! |------------------|------------------------|
//! | Prolog           | [`Prolog`]             |
//! | Energy use       | [`EnergyUse`]          |
//! | Dynamic results  | `Vec<`[`PeriodResult`]`>` |
//! | Epilog           | [`Epilog`]             |
//!
//! All indices are 0-based; the file stores them 1-based and the decoders
//! rebase them on load.  Sections are pure data.  [`ResultModel`] only hands
//! out shared references, and a section becomes visible as a whole once its
//! decoder has returned.

use serde::Serialize;
use std::path::PathBuf;

// ── Option codes ─────────────────────────────────────────────────────────────

macro_rules! coded_option {
    (
        $(#[$meta:meta])*
        $name:ident { $($code:literal => $variant:ident : $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub enum $name {
            $($variant,)+
            /// Code not defined by the file format; kept verbatim.
            Unknown(i32),
        }

        impl $name {
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }

            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code,)+
                    $name::Unknown(c) => c,
                }
            }

            /// Human-readable label, as printed in reports and CSV headers.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown(_) => "unknown",
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

coded_option! {
    /// Water quality analysis mode.
    WaterQuality {
        0 => None: "none",
        1 => Chemical: "chemical",
        2 => Age: "age",
        3 => SourceTrace: "source trace",
    }
}

coded_option! {
    FlowUnits {
        0 => Cfs: "cubic feet/second",
        1 => Gpm: "gallons/minute",
        2 => Mgd: "million gallons/day",
        3 => Imgd: "Imperial million gallons/day",
        4 => Afd: "acre-ft/day",
        5 => Lps: "liters/second",
        6 => Lpm: "liters/minute",
        7 => Mld: "megaliters/day",
        8 => Cmh: "cubic meters/hour",
        9 => Cmd: "cubic meters/day",
    }
}

coded_option! {
    PressureUnits {
        0 => Psi: "pounds/square inch",
        1 => Meters: "meters",
        2 => KiloPascals: "kiloPascals",
    }
}

coded_option! {
    /// Time statistics applied to the reported values.
    TimeStats {
        0 => Series: "none (report time series)",
        1 => Average: "report time-averaged values",
        2 => Minimum: "report minimum values",
        3 => Maximum: "report maximum values",
        4 => Range: "report ranges",
    }
}

coded_option! {
    LinkType {
        0 => CvPipe: "Pipe with CV",
        1 => Pipe: "Pipe",
        2 => Pump: "Pump",
        3 => Prv: "PRV",
        4 => Psv: "PSV",
        5 => Pbv: "PBV",
        6 => Fcv: "FCV",
        7 => Tcv: "TCV",
        8 => Gpv: "GPV",
    }
}

// ── Prolog ───────────────────────────────────────────────────────────────────

/// Fixed-size scalar part of the prolog, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrologHeader {
    pub magic:          i32,
    pub version:        i32,
    pub pump_count:     usize,
    pub valve_count:    usize,
    pub water_quality:  WaterQuality,
    /// Node used for source tracing; the file stores 0 when there is none.
    pub source_node:    Option<usize>,
    pub flow_units:     FlowUnits,
    pub pressure_units: PressureUnits,
    pub time_stats:     TimeStats,
    /// Seconds.
    pub start_time:     i32,
    pub report_step:    i32,
    pub duration:       i32,
    pub titles:         [String; 3],
    pub input_file:     String,
    pub report_file:    String,
    pub chemical_name:  String,
    pub chemical_units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id:        String,
    pub elevation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub id:       String,
    pub start:    usize,
    pub end:      usize,
    pub kind:     LinkType,
    pub length:   f32,
    pub diameter: f32,
}

/// A storage node.  An area of exactly 0.0 marks a reservoir.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankReservoir {
    pub node: usize,
    pub area: f32,
}

impl TankReservoir {
    pub fn is_reservoir(&self) -> bool { self.area == 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Junction,
    Reservoir,
    Tank,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Junction  => "Junction",
            NodeKind::Reservoir => "Reservoir",
            NodeKind::Tank      => "Tank",
        }
    }
}

/// Network topology and run configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prolog {
    pub header: PrologHeader,
    pub nodes:  Vec<Node>,
    pub links:  Vec<Link>,
    pub tanks:  Vec<TankReservoir>,

    // Derived on construction.
    junction_count:  usize,
    pipe_count:      usize,
    reservoir_count: usize,
    tank_count:      usize,
    node_tank:       Vec<Option<usize>>,
}

impl Prolog {
    /// Assemble a prolog and compute the derived counts and the
    /// node → tank/reservoir lookup.  Callers must have validated that every
    /// index in `links` and `tanks` is in range.
    pub fn new(
        header: PrologHeader,
        nodes:  Vec<Node>,
        links:  Vec<Link>,
        tanks:  Vec<TankReservoir>,
    ) -> Self {
        let mut node_tank = vec![None; nodes.len()];
        for (slot, t) in tanks.iter().enumerate() {
            if let Some(entry) = node_tank.get_mut(t.node) {
                *entry = Some(slot);
            }
        }
        let reservoir_count = tanks.iter().filter(|t| t.is_reservoir()).count();
        Self {
            junction_count:  nodes.len().saturating_sub(tanks.len()),
            pipe_count:      links.len().saturating_sub(header.pump_count + header.valve_count),
            reservoir_count,
            tank_count:      tanks.len() - reservoir_count,
            node_tank,
            header,
            nodes,
            links,
            tanks,
        }
    }

    pub fn magic(&self) -> i32 { self.header.magic }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn link_count(&self) -> usize { self.links.len() }
    pub fn tank_reservoir_count(&self) -> usize { self.tanks.len() }
    pub fn pump_count(&self) -> usize { self.header.pump_count }
    pub fn valve_count(&self) -> usize { self.header.valve_count }
    pub fn junction_count(&self) -> usize { self.junction_count }
    pub fn pipe_count(&self) -> usize { self.pipe_count }
    pub fn reservoir_count(&self) -> usize { self.reservoir_count }
    pub fn tank_count(&self) -> usize { self.tank_count }

    /// Tank/reservoir slot of node `node`, `None` for a junction.
    pub fn tank_slot(&self, node: usize) -> Option<usize> {
        self.node_tank.get(node).copied().flatten()
    }

    pub fn node_kind(&self, node: usize) -> NodeKind {
        match self.tank_slot(node).map(|slot| &self.tanks[slot]) {
            None                          => NodeKind::Junction,
            Some(t) if t.is_reservoir()   => NodeKind::Reservoir,
            Some(_)                       => NodeKind::Tank,
        }
    }

    /// Cross-section area of a tank node; 0.0 for junctions and reservoirs.
    pub fn node_area(&self, node: usize) -> f32 {
        self.tank_slot(node).map_or(0.0, |slot| self.tanks[slot].area)
    }

    /// Simulation clock time (seconds) of reporting period `period`.
    pub fn period_time(&self, period: usize) -> i64 {
        i64::from(self.header.start_time) + period as i64 * i64::from(self.header.report_step)
    }
}

// ── Energy use ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpEnergy {
    /// 0-based link index of the pump.
    pub link:                 usize,
    /// Percent of time online.
    pub utilization:          f32,
    pub average_efficiency:   f32,
    pub average_kw_per_volume: f32,
    pub average_kw:           f32,
    pub peak_kw:              f32,
    pub average_cost_per_day: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyUse {
    pub pumps:              Vec<PumpEnergy>,
    pub peak_energy_usage:  f32,
}

// ── Dynamic results ──────────────────────────────────────────────────────────

/// One reporting period.  Node arrays are indexed by node, link arrays by link.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PeriodResult {
    pub node_demand:          Vec<f32>,
    pub node_head:            Vec<f32>,
    pub node_pressure:        Vec<f32>,
    pub node_water_quality:   Vec<f32>,
    pub link_flow:            Vec<f32>,
    pub link_velocity:        Vec<f32>,
    pub link_headloss:        Vec<f32>,
    pub link_avg_water_quality: Vec<f32>,
    pub link_status:          Vec<f32>,
    pub link_setting:         Vec<f32>,
    pub link_reaction_rate:   Vec<f32>,
    pub link_friction_factor: Vec<f32>,
}

impl PeriodResult {
    pub fn node_count(&self) -> usize { self.node_demand.len() }
    pub fn link_count(&self) -> usize { self.link_flow.len() }
}

// ── Epilog ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Epilog {
    pub avg_bulk_reaction_rate: f32,
    pub avg_wall_reaction_rate: f32,
    pub avg_tank_reaction_rate: f32,
    pub avg_source_inflow_rate: f32,
    pub period_count:           usize,
    pub warning_flag:           i32,
    pub magic:                  i32,
}

impl Epilog {
    pub fn has_warnings(&self) -> bool { self.warning_flag != 0 }
}

/// Last three fields of the file, read before anything else to verify the
/// file type and to learn the period count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trailer {
    pub period_count: usize,
    pub warning_flag: i32,
    pub magic:        i32,
}

// ── Result model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub size: u64,
}

/// Everything decoded from one file.  Only the crate fills it in; handlers
/// and callers get read access.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultModel {
    source:          Option<SourceInfo>,
    trailer:         Option<Trailer>,
    prolog:          Option<Prolog>,
    energy_use:      Option<EnergyUse>,
    dynamic_results: Option<Vec<PeriodResult>>,
    epilog:          Option<Epilog>,
}

impl ResultModel {
    pub fn source(&self) -> Option<&SourceInfo> { self.source.as_ref() }
    pub fn trailer(&self) -> Option<&Trailer> { self.trailer.as_ref() }
    pub fn prolog(&self) -> Option<&Prolog> { self.prolog.as_ref() }
    pub fn energy_use(&self) -> Option<&EnergyUse> { self.energy_use.as_ref() }
    pub fn epilog(&self) -> Option<&Epilog> { self.epilog.as_ref() }

    pub fn dynamic_results(&self) -> Option<&[PeriodResult]> {
        self.dynamic_results.as_deref()
    }

    pub fn period(&self, index: usize) -> Option<&PeriodResult> {
        self.dynamic_results.as_ref()?.get(index)
    }

    pub(crate) fn set_source(&mut self, source: SourceInfo) { self.source = Some(source); }
    pub(crate) fn set_trailer(&mut self, trailer: Trailer) { self.trailer = Some(trailer); }
    pub(crate) fn set_prolog(&mut self, prolog: Prolog) { self.prolog = Some(prolog); }
    pub(crate) fn set_energy_use(&mut self, energy: EnergyUse) { self.energy_use = Some(energy); }
    pub(crate) fn set_epilog(&mut self, epilog: Epilog) { self.epilog = Some(epilog); }

    pub(crate) fn set_dynamic_results(&mut self, periods: Vec<PeriodResult>) {
        self.dynamic_results = Some(periods);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PrologHeader {
        PrologHeader {
            magic: 1,
            version: 20012,
            pump_count: 1,
            valve_count: 0,
            water_quality: WaterQuality::from_code(0),
            source_node: None,
            flow_units: FlowUnits::from_code(1),
            pressure_units: PressureUnits::from_code(0),
            time_stats: TimeStats::from_code(0),
            start_time: 0,
            report_step: 3600,
            duration: 86400,
            titles: Default::default(),
            input_file: String::new(),
            report_file: String::new(),
            chemical_name: String::new(),
            chemical_units: String::new(),
        }
    }

    fn node(id: &str) -> Node {
        Node { id: id.into(), elevation: 0.0 }
    }

    #[test]
    fn derived_counts_and_node_kinds() {
        let links = vec![
            Link { id: "P1".into(), start: 0, end: 1, kind: LinkType::Pipe, length: 1.0, diameter: 1.0 },
            Link { id: "PU".into(), start: 2, end: 0, kind: LinkType::Pump, length: 0.0, diameter: 0.0 },
        ];
        let tanks = vec![
            TankReservoir { node: 2, area: 0.0 },
            TankReservoir { node: 1, area: 50.0 },
        ];
        let p = Prolog::new(header(), vec![node("J"), node("T"), node("R")], links, tanks);

        assert_eq!(p.junction_count(), 1);
        assert_eq!(p.pipe_count(), 1);
        assert_eq!(p.reservoir_count(), 1);
        assert_eq!(p.tank_count(), 1);
        assert_eq!(p.node_kind(0), NodeKind::Junction);
        assert_eq!(p.node_kind(1), NodeKind::Tank);
        assert_eq!(p.node_kind(2), NodeKind::Reservoir);
        assert_eq!(p.node_area(1), 50.0);
        assert_eq!(p.tank_slot(2), Some(0));
    }

    #[test]
    fn unknown_codes_are_kept() {
        let f = FlowUnits::from_code(42);
        assert_eq!(f, FlowUnits::Unknown(42));
        assert_eq!(f.code(), 42);
        assert_eq!(f.label(), "unknown");
        assert_eq!(LinkType::from_code(3).label(), "PRV");
        assert_eq!(TimeStats::from_code(4).to_string(), "report ranges");
    }

    #[test]
    fn period_time_uses_report_step() {
        let mut h = header();
        h.start_time = 600;
        let p = Prolog::new(h, vec![], vec![], vec![]);
        assert_eq!(p.period_time(0), 600);
        assert_eq!(p.period_time(3), 600 + 3 * 3600);
    }
}
