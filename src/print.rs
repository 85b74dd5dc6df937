//! Plain-text section reports.

use chrono::Duration;
use std::io::{self, Write};

use crate::model::{EnergyUse, Epilog, NodeKind, PeriodResult, Prolog};

fn heading<W: Write + ?Sized>(w: &mut W, text: &str) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "{text}")?;
    writeln!(w, "{}", "=".repeat(text.len()))
}

/// `seconds` as `H:MM:SS`, hours unbounded.
pub fn clock_time(seconds: i64) -> String {
    let Some(d) = Duration::try_seconds(seconds) else {
        return format!("{seconds}s");
    };
    let sign = if seconds < 0 { "-" } else { "" };
    let d = d.abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        d.num_hours(),
        d.num_minutes() % 60,
        d.num_seconds() % 60,
    )
}

pub fn write_prolog<W: Write + ?Sized>(w: &mut W, p: &Prolog) -> io::Result<()> {
    let h = &p.header;
    heading(w, "Prolog")?;
    writeln!(w, "Magic number: {}", h.magic)?;
    writeln!(w, "EPANET Version: {}", h.version)?;
    writeln!(w, "Number of Nodes: {}", p.node_count())?;
    writeln!(
        w,
        "Number of Reservoirs ({}) + Tanks ({}): {} (so {} Junctions)",
        p.reservoir_count(), p.tank_count(), p.tank_reservoir_count(), p.junction_count(),
    )?;
    writeln!(w, "Number of Links: {}", p.link_count())?;
    writeln!(w, "Number of Pumps: {}", p.pump_count())?;
    writeln!(w, "Number of Valves: {}", p.valve_count())?;
    writeln!(w, "  (Number of Pipes: {})", p.pipe_count())?;
    writeln!(w, "Water Quality Option: {} ({})", h.water_quality.code(), h.water_quality)?;
    match h.source_node {
        Some(n) => writeln!(w, "Index of node for Source Tracing: {n}")?,
        None    => writeln!(w, "Index of node for Source Tracing: none")?,
    }
    writeln!(w, "Flow Units Option: {} ({})", h.flow_units.code(), h.flow_units)?;
    writeln!(w, "Pressure Units Option: {} ({})", h.pressure_units.code(), h.pressure_units)?;
    writeln!(w, "Time Statistics Flag: {} ({})", h.time_stats.code(), h.time_stats)?;
    writeln!(w, "Reporting Start Time: {}", h.start_time)?;
    writeln!(w, "Reporting Time Step: {}", h.report_step)?;
    writeln!(w, "Simulation Duration: {}", h.duration)?;
    for (i, title) in h.titles.iter().enumerate() {
        writeln!(w, "Problem Title{}: {}", i + 1, title)?;
    }
    writeln!(w, "Name of Input File: {}", h.input_file)?;
    writeln!(w, "Name of Report File: {}", h.report_file)?;
    writeln!(w, "Name of Chemical: {}", h.chemical_name)?;
    writeln!(w, "Chemical Concentration Units: {}", h.chemical_units)?;

    writeln!(w, "Node details ({}):", p.node_count())?;
    for (i, node) in p.nodes.iter().enumerate() {
        match p.node_kind(i) {
            NodeKind::Junction => writeln!(
                w, "  {i}: ID {}, elevation: {:.6}", node.id, node.elevation,
            )?,
            NodeKind::Reservoir => writeln!(
                w, "  {i}: ID {}, elevation: {:.6} (RESERVOIR)", node.id, node.elevation,
            )?,
            NodeKind::Tank => writeln!(
                w, "  {i}: ID {}, elevation: {:.6}, Tank x-sect area: {:.6}",
                node.id, node.elevation, p.node_area(i),
            )?,
        }
    }

    writeln!(w, "Link details ({}):", p.link_count())?;
    for (i, l) in p.links.iter().enumerate() {
        writeln!(
            w,
            "  {i}: ID {}, start: {}, end: {}, type: {} ({}), length: {:.6}, diam: {:.6}",
            l.id, l.start, l.end, l.kind.code(), l.kind, l.length, l.diameter,
        )?;
    }
    writeln!(w)
}

pub fn write_energy_use<W: Write + ?Sized>(w: &mut W, p: &Prolog, e: &EnergyUse) -> io::Result<()> {
    heading(w, "Energy Use")?;
    writeln!(w, "Energy Use for {} Pumps", p.pump_count())?;
    for (i, pump) in e.pumps.iter().enumerate() {
        writeln!(
            w,
            "Pump {i}: link {}, util {:.6}%, effic {:.6}%, Ave kW/vol {:.6}, Ave {:.6} kW, \
             Peak {:.6} kW, Ave cost/day {:.6}",
            pump.link, pump.utilization, pump.average_efficiency, pump.average_kw_per_volume,
            pump.average_kw, pump.peak_kw, pump.average_cost_per_day,
        )?;
    }
    writeln!(w, "Peak energy usage: {:.6}", e.peak_energy_usage)?;
    writeln!(w)
}

pub fn write_dynamic_results<W: Write + ?Sized>(
    w:       &mut W,
    p:       &Prolog,
    periods: &[PeriodResult],
) -> io::Result<()> {
    heading(w, "Dynamic Results")?;
    for (i, d) in periods.iter().enumerate() {
        writeln!(w, "TimeStep {i} ({})", clock_time(p.period_time(i)))?;
        writeln!(w, " Nodes")?;
        for j in 0..d.node_count() {
            writeln!(
                w, "  Node {j}: demand {:.6}, head {:.6}, pressure {:.6}, water quality {:.6}",
                at(&d.node_demand, j), at(&d.node_head, j),
                at(&d.node_pressure, j), at(&d.node_water_quality, j),
            )?;
        }
        writeln!(w, " Links")?;
        for j in 0..d.link_count() {
            writeln!(
                w,
                "  Link {j}: flow {:.6}, velocity {:.6}, headloss {:.6}, ave water qual {:.6}, \
                 status {:.6}, setting {:.6}, react rate {:.6}, frict fact {:.6}",
                at(&d.link_flow, j), at(&d.link_velocity, j),
                at(&d.link_headloss, j), at(&d.link_avg_water_quality, j),
                at(&d.link_status, j), at(&d.link_setting, j),
                at(&d.link_reaction_rate, j), at(&d.link_friction_factor, j),
            )?;
        }
        writeln!(w)?;
    }
    Ok(())
}

// Arrays of a hand-built period may be shorter than its node or link count.
fn at(values: &[f32], index: usize) -> f32 {
    values.get(index).copied().unwrap_or(f32::NAN)
}

pub fn write_epilog<W: Write + ?Sized>(w: &mut W, e: &Epilog) -> io::Result<()> {
    heading(w, "Epilog")?;
    writeln!(w, "Average Bulk Reaction Rate: {:.6}", e.avg_bulk_reaction_rate)?;
    writeln!(w, "Average Wall Reaction Rate: {:.6}", e.avg_wall_reaction_rate)?;
    writeln!(w, "Average Tank Reaction Rate: {:.6}", e.avg_tank_reaction_rate)?;
    writeln!(w, "Average Source Inflow Rate: {:.6}", e.avg_source_inflow_rate)?;
    writeln!(w, "Number of reporting periods: {}", e.period_count)?;
    writeln!(w, "{}", warning_text(e.warning_flag))?;
    writeln!(w, "Magic number: {}", e.magic)?;
    writeln!(w)
}

pub fn warning_text(flag: i32) -> &'static str {
    if flag == 0 {
        "Analysis generated no errors or warnings"
    } else {
        "Analysis generated warning(s)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::test_support::{pumped, sample};

    fn text(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn clock_time_formats() {
        assert_eq!(clock_time(0), "0:00:00");
        assert_eq!(clock_time(3600 + 61), "1:01:01");
        assert_eq!(clock_time(30 * 3600), "30:00:00");
        assert_eq!(clock_time(-90), "-0:01:30");
    }

    #[test]
    fn prolog_annotates_node_kinds() {
        let s = pumped();
        let t = text(|w| write_prolog(w, &s.prolog));
        assert!(t.contains("\nProlog\n======\n"));
        assert!(t.contains("Number of Reservoirs (1) + Tanks (1): 2 (so 2 Junctions)"));
        assert!(t.contains("  3: ID R1, elevation: 0.000000 (RESERVOIR)"));
        assert!(t.contains("  2: ID T1, elevation: 30.000000, Tank x-sect area: 113.000000"));
        assert!(t.contains("type: 2 (Pump)"));
        assert!(t.contains("Index of node for Source Tracing: none"));
    }

    #[test]
    fn epilog_reports_warning_flag() {
        let mut e = sample().epilog;
        assert!(text(|w| write_epilog(w, &e)).contains("no errors or warnings"));
        e.warning_flag = 1;
        assert!(text(|w| write_epilog(w, &e)).contains("Analysis generated warning(s)"));
    }

    #[test]
    fn dynamic_results_list_every_period() {
        let s = pumped();
        let t = text(|w| write_dynamic_results(w, &s.prolog, &s.periods));
        assert!(t.contains("TimeStep 0 (0:00:00)"));
        assert!(t.contains("TimeStep 1 (1:00:00)"));
        assert_eq!(t.matches("  Node ").count(), 8);
        assert_eq!(t.matches("  Link ").count(), 6);
    }

    #[test]
    fn ragged_period_prints_missing_values_as_nan() {
        let s = sample();
        let mut period = s.periods[0].clone();
        period.node_pressure.clear();
        period.link_friction_factor.clear();
        let t = text(|w| write_dynamic_results(w, &s.prolog, &[period]));
        assert!(t.contains("  Node 1: demand 0.000000, head 50.000000, pressure NaN, water quality 0.300000"));
        assert!(t.contains("react rate 0.000000, frict fact NaN"));
    }
}
