//! Encoder for the output file layout, the inverse of [`crate::section`].
//!
//! Used to re-emit a decoded model and to build fixtures.  Values are written
//! exactly as given: indices are converted back to 1-based, counts come from
//! the records, and the epilog's period count and magic are taken verbatim
//! (so deliberately inconsistent files can be produced).

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::model::{EnergyUse, Epilog, PeriodResult, Prolog, ResultModel};
use crate::section::{CHEM_WIDTH, ID_WIDTH, PATH_WIDTH, TITLE_WIDTH};

/// Write all four sections to `writer`.
pub fn write_output<W: Write>(
    mut writer: W,
    prolog:     &Prolog,
    energy:     &EnergyUse,
    periods:    &[PeriodResult],
    epilog:     &Epilog,
) -> io::Result<()> {
    write_prolog(&mut writer, prolog)?;
    write_energy_use(&mut writer, energy)?;
    for (i, period) in periods.iter().enumerate() {
        write_period(&mut writer, prolog, i, period)?;
    }
    write_epilog(&mut writer, epilog)?;
    writer.flush()
}

/// Re-emit a fully decoded model.
pub fn write_model<W: Write>(writer: W, model: &ResultModel) -> io::Result<()> {
    let missing = |what: &str| io::Error::new(io::ErrorKind::InvalidInput, format!("model has no {what} section"));
    write_output(
        writer,
        model.prolog().ok_or_else(|| missing("prolog"))?,
        model.energy_use().ok_or_else(|| missing("energy use"))?,
        model.dynamic_results().ok_or_else(|| missing("dynamic results"))?,
        model.epilog().ok_or_else(|| missing("epilog"))?,
    )
}

fn write_prolog<W: Write>(w: &mut W, p: &Prolog) -> io::Result<()> {
    let h = &p.header;
    w.write_i32::<LittleEndian>(h.magic)?;
    w.write_i32::<LittleEndian>(h.version)?;
    write_count(w, p.node_count())?;
    write_count(w, p.tank_reservoir_count())?;
    write_count(w, p.link_count())?;
    write_count(w, h.pump_count)?;
    write_count(w, h.valve_count)?;
    w.write_i32::<LittleEndian>(h.water_quality.code())?;
    match h.source_node {
        Some(node) => write_index(w, node)?,
        None       => w.write_i32::<LittleEndian>(0)?,
    }
    w.write_i32::<LittleEndian>(h.flow_units.code())?;
    w.write_i32::<LittleEndian>(h.pressure_units.code())?;
    w.write_i32::<LittleEndian>(h.time_stats.code())?;
    w.write_i32::<LittleEndian>(h.start_time)?;
    w.write_i32::<LittleEndian>(h.report_step)?;
    w.write_i32::<LittleEndian>(h.duration)?;
    for title in &h.titles {
        write_text(w, title, TITLE_WIDTH)?;
    }
    write_text(w, &h.input_file, PATH_WIDTH)?;
    write_text(w, &h.report_file, PATH_WIDTH)?;
    write_text(w, &h.chemical_name, CHEM_WIDTH)?;
    write_text(w, &h.chemical_units, CHEM_WIDTH)?;

    for n in &p.nodes { write_text(w, &n.id, ID_WIDTH)?; }
    for l in &p.links { write_text(w, &l.id, ID_WIDTH)?; }
    for l in &p.links { write_index(w, l.start)?; }
    for l in &p.links { write_index(w, l.end)?; }
    for l in &p.links { w.write_i32::<LittleEndian>(l.kind.code())?; }
    for t in &p.tanks { write_index(w, t.node)?; }
    for t in &p.tanks { w.write_f32::<LittleEndian>(t.area)?; }
    for n in &p.nodes { w.write_f32::<LittleEndian>(n.elevation)?; }
    for l in &p.links { w.write_f32::<LittleEndian>(l.length)?; }
    for l in &p.links { w.write_f32::<LittleEndian>(l.diameter)?; }
    Ok(())
}

fn write_energy_use<W: Write>(w: &mut W, e: &EnergyUse) -> io::Result<()> {
    for pump in &e.pumps {
        write_index(w, pump.link)?;
        w.write_f32::<LittleEndian>(pump.utilization)?;
        w.write_f32::<LittleEndian>(pump.average_efficiency)?;
        w.write_f32::<LittleEndian>(pump.average_kw_per_volume)?;
        w.write_f32::<LittleEndian>(pump.average_kw)?;
        w.write_f32::<LittleEndian>(pump.peak_kw)?;
        w.write_f32::<LittleEndian>(pump.average_cost_per_day)?;
    }
    w.write_f32::<LittleEndian>(e.peak_energy_usage)
}

fn write_period<W: Write>(w: &mut W, p: &Prolog, index: usize, r: &PeriodResult) -> io::Result<()> {
    let node_groups = [&r.node_demand, &r.node_head, &r.node_pressure, &r.node_water_quality];
    let link_groups = [
        &r.link_flow, &r.link_velocity, &r.link_headloss, &r.link_avg_water_quality,
        &r.link_status, &r.link_setting, &r.link_reaction_rate, &r.link_friction_factor,
    ];
    for group in node_groups {
        write_group(w, group, p.node_count(), index)?;
    }
    for group in link_groups {
        write_group(w, group, p.link_count(), index)?;
    }
    Ok(())
}

fn write_epilog<W: Write>(w: &mut W, e: &Epilog) -> io::Result<()> {
    w.write_f32::<LittleEndian>(e.avg_bulk_reaction_rate)?;
    w.write_f32::<LittleEndian>(e.avg_wall_reaction_rate)?;
    w.write_f32::<LittleEndian>(e.avg_tank_reaction_rate)?;
    w.write_f32::<LittleEndian>(e.avg_source_inflow_rate)?;
    write_count(w, e.period_count)?;
    w.write_i32::<LittleEndian>(e.warning_flag)?;
    w.write_i32::<LittleEndian>(e.magic)
}

fn write_group<W: Write>(w: &mut W, values: &[f32], expected: usize, period: usize) -> io::Result<()> {
    if values.len() != expected {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!(
            "period {period}: array has {} values, network needs {expected}", values.len()
        )));
    }
    for &v in values {
        w.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

fn write_count<W: Write>(w: &mut W, count: usize) -> io::Result<()> {
    let v = i32::try_from(count)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("count {count} exceeds i32")))?;
    w.write_i32::<LittleEndian>(v)
}

fn write_index<W: Write>(w: &mut W, index: usize) -> io::Result<()> {
    write_count(w, index + 1)
}

fn write_text<W: Write>(w: &mut W, text: &str, width: usize) -> io::Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() > width {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!(
            "text {text:?} is longer than its {width}-byte field"
        )));
    }
    w.write_all(bytes)?;
    w.write_all(&vec![0u8; width - bytes.len()])
}
