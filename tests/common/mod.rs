#![allow(dead_code)]

use epanet_output::model::*;
use epanet_output::writer::write_output;
use std::io::Write;
use tempfile::NamedTempFile;

pub const MAGIC: i32 = 516114521;

pub struct Fixture {
    pub prolog:     Prolog,
    pub energy_use: EnergyUse,
    pub periods:    Vec<PeriodResult>,
    pub epilog:     Epilog,
}

impl Fixture {
    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_output(&mut bytes, &self.prolog, &self.energy_use, &self.periods, &self.epilog).unwrap();
        bytes
    }

    pub fn file(&self) -> NamedTempFile {
        write_temp(&self.bytes())
    }
}

pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

fn header(pumps: usize) -> PrologHeader {
    PrologHeader {
        magic:          MAGIC,
        version:        20012,
        pump_count:     pumps,
        valve_count:    0,
        water_quality:  WaterQuality::Chemical,
        source_node:    None,
        flow_units:     FlowUnits::Lps,
        pressure_units: PressureUnits::Meters,
        time_stats:     TimeStats::Series,
        start_time:     0,
        report_step:    1800,
        duration:       3600,
        titles:         ["Two node test".into(), String::new(), String::new()],
        input_file:     "two.inp".into(),
        report_file:    String::new(),
        chemical_name:  "Chlorine".into(),
        chemical_units: "mg/L".into(),
    }
}

fn period(k: f32, pressure: [f32; 2]) -> PeriodResult {
    PeriodResult {
        node_demand:            vec![1.5 * k, -1.5 * k],
        node_head:              vec![90.0, 50.0],
        node_pressure:          pressure.to_vec(),
        node_water_quality:     vec![0.5, 1.0],
        link_flow:              vec![1.5 * k],
        link_velocity:          vec![0.25 * k],
        link_headloss:          vec![0.4],
        link_avg_water_quality: vec![0.75],
        link_status:            vec![3.0],
        link_setting:           vec![100.0],
        link_reaction_rate:     vec![0.0],
        link_friction_factor:   vec![0.018],
    }
}

/// Junction J1 fed from reservoir R1 by pipe P1; `pressures[k]` is the
/// junction pressure of period k.
pub fn two_node(pressures: &[f32]) -> Fixture {
    let prolog = Prolog::new(
        header(0),
        vec![
            Node { id: "J1".into(), elevation: 40.0 },
            Node { id: "R1".into(), elevation: 90.0 },
        ],
        vec![Link { id: "P1".into(), start: 1, end: 0, kind: LinkType::Pipe, length: 500.0, diameter: 200.0 }],
        vec![TankReservoir { node: 1, area: 0.0 }],
    );
    let periods = pressures
        .iter()
        .enumerate()
        .map(|(k, &p)| period(k as f32 + 1.0, [p, 0.0]))
        .collect::<Vec<_>>();
    Fixture {
        prolog,
        energy_use: EnergyUse { pumps: vec![], peak_energy_usage: 0.0 },
        epilog: epilog(periods.len()),
        periods,
    }
}

pub fn epilog(periods: usize) -> Epilog {
    Epilog {
        avg_bulk_reaction_rate: 0.1,
        avg_wall_reaction_rate: 0.2,
        avg_tank_reaction_rate: 0.0,
        avg_source_inflow_rate: 3.0,
        period_count:           periods,
        warning_flag:           0,
        magic:                  MAGIC,
    }
}

/// No nodes, links, tanks or pumps; the trailer and epilog claim `periods`.
pub fn empty_network(periods: usize) -> Fixture {
    Fixture {
        prolog:     Prolog::new(header(0), vec![], vec![], vec![]),
        energy_use: EnergyUse { pumps: vec![], peak_energy_usage: 0.0 },
        periods:    vec![],
        epilog:     epilog(periods),
    }
}
