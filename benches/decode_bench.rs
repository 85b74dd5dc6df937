use criterion::{black_box, criterion_group, criterion_main, Criterion};
use epanet_output::export::export_to_writer;
use epanet_output::model::*;
use epanet_output::writer::write_output;
use epanet_output::{decode_file, ExportKey};
use std::io::Write;
use tempfile::NamedTempFile;

const NODES:   usize = 2_000;
const LINKS:   usize = 2_400;
const PERIODS: usize = 96;

fn network() -> Vec<u8> {
    let header = PrologHeader {
        magic:          516114521,
        version:        20012,
        pump_count:     0,
        valve_count:    0,
        water_quality:  WaterQuality::Age,
        source_node:    None,
        flow_units:     FlowUnits::Lps,
        pressure_units: PressureUnits::Meters,
        time_stats:     TimeStats::Series,
        start_time:     0,
        report_step:    900,
        duration:       86_400,
        titles:         ["bench".into(), String::new(), String::new()],
        input_file:     "bench.inp".into(),
        report_file:    String::new(),
        chemical_name:  String::new(),
        chemical_units: String::new(),
    };
    let nodes = (0..NODES)
        .map(|i| Node { id: format!("N{i}"), elevation: i as f32 * 0.1 })
        .collect();
    let links = (0..LINKS)
        .map(|i| Link {
            id:       format!("L{i}"),
            start:    i % NODES,
            end:      (i * 7 + 1) % NODES,
            kind:     LinkType::Pipe,
            length:   100.0,
            diameter: 150.0,
        })
        .collect();
    let prolog = Prolog::new(header, nodes, links, vec![TankReservoir { node: 0, area: 0.0 }]);

    let period = |k: usize| {
        let n = vec![k as f32; NODES];
        let l = vec![k as f32 * 0.5; LINKS];
        PeriodResult {
            node_demand: n.clone(), node_head: n.clone(), node_pressure: n.clone(), node_water_quality: n,
            link_flow: l.clone(), link_velocity: l.clone(), link_headloss: l.clone(),
            link_avg_water_quality: l.clone(), link_status: l.clone(), link_setting: l.clone(),
            link_reaction_rate: l.clone(), link_friction_factor: l,
        }
    };
    let periods: Vec<_> = (0..PERIODS).map(period).collect();
    let epilog = Epilog {
        avg_bulk_reaction_rate: 0.0,
        avg_wall_reaction_rate: 0.0,
        avg_tank_reaction_rate: 0.0,
        avg_source_inflow_rate: 0.0,
        period_count:           PERIODS,
        warning_flag:           0,
        magic:                  516114521,
    };
    let energy = EnergyUse { pumps: vec![], peak_energy_usage: 0.0 };

    let mut bytes = Vec::new();
    write_output(&mut bytes, &prolog, &energy, &periods, &epilog).unwrap();
    bytes
}

fn bench_decode(c: &mut Criterion) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&network()).unwrap();
    file.flush().unwrap();

    c.bench_function("decode_2k_nodes_96_periods", |b| {
        b.iter(|| decode_file(black_box(file.path())).unwrap())
    });
}

fn bench_export(c: &mut Criterion) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&network()).unwrap();
    file.flush().unwrap();
    let model = decode_file(file.path()).unwrap();

    c.bench_function("export_dynamic_node_csv", |b| {
        b.iter(|| export_to_writer(ExportKey::DynamicNodeCsv, black_box(&model), &mut std::io::sink()).unwrap())
    });
    c.bench_function("export_dynamic_link_csv", |b| {
        b.iter(|| export_to_writer(ExportKey::DynamicLinkCsv, black_box(&model), &mut std::io::sink()).unwrap())
    });
}

criterion_group!(benches, bench_decode, bench_export);
criterion_main!(benches);
