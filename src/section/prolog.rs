use std::io::{Read, Seek};

use super::{rebase, CHEM_WIDTH, ID_WIDTH, PATH_WIDTH, TITLE_WIDTH};
use crate::cursor::{Cursor, DecodeError};
use crate::model::{
    FlowUnits, Link, LinkType, Node, PressureUnits, Prolog, PrologHeader, TankReservoir,
    TimeStats, WaterQuality,
};

/// Decode the prolog.  `tail_magic` is the magic number already read from the
/// end of the file; a different leading magic means the file is not an
/// output file at all and nothing else is read.
pub fn decode_prolog<R: Read + Seek>(
    cursor:     &mut Cursor<R>,
    tail_magic: i32,
) -> Result<Prolog, DecodeError> {
    let magic = cursor.read_i32()?;
    if magic != tail_magic {
        return Err(DecodeError::FormatMismatch { head: magic, tail: tail_magic });
    }
    let version     = cursor.read_i32()?;
    let node_count  = cursor.read_count("node count")?;
    let tank_count  = cursor.read_count("tank/reservoir count")?;
    let link_count  = cursor.read_count("link count")?;
    let pump_count  = cursor.read_count("pump count")?;
    let valve_count = cursor.read_count("valve count")?;
    if tank_count > node_count {
        return Err(DecodeError::IndexOutOfRange {
            what: "tank/reservoir count", index: tank_count as i64, len: node_count + 1,
        });
    }
    if pump_count + valve_count > link_count {
        return Err(DecodeError::IndexOutOfRange {
            what: "pump + valve count", index: (pump_count + valve_count) as i64, len: link_count + 1,
        });
    }

    let water_quality = WaterQuality::from_code(cursor.read_i32()?);
    let source_raw    = cursor.read_i32()?;
    let source_node   = match source_raw {
        0 => None,
        raw => Some(rebase(raw, "source node", node_count)?),
    };
    let flow_units     = FlowUnits::from_code(cursor.read_i32()?);
    let pressure_units = PressureUnits::from_code(cursor.read_i32()?);
    let time_stats     = TimeStats::from_code(cursor.read_i32()?);
    let start_time     = cursor.read_i32()?;
    let report_step    = cursor.read_i32()?;
    let duration       = cursor.read_i32()?;
    let titles = [
        cursor.read_fixed_text(TITLE_WIDTH)?,
        cursor.read_fixed_text(TITLE_WIDTH)?,
        cursor.read_fixed_text(TITLE_WIDTH)?,
    ];
    let input_file     = cursor.read_fixed_text(PATH_WIDTH)?;
    let report_file    = cursor.read_fixed_text(PATH_WIDTH)?;
    let chemical_name  = cursor.read_fixed_text(CHEM_WIDTH)?;
    let chemical_units = cursor.read_fixed_text(CHEM_WIDTH)?;

    let header = PrologHeader {
        magic,
        version,
        pump_count,
        valve_count,
        water_quality,
        source_node,
        flow_units,
        pressure_units,
        time_stats,
        start_time,
        report_step,
        duration,
        titles,
        input_file,
        report_file,
        chemical_name,
        chemical_units,
    };

    // Column-ordered arrays.  Check the bytes exist before allocating so a
    // corrupt count cannot trigger a huge allocation.
    cursor.ensure((node_count * ID_WIDTH) as u64)?;
    let node_ids = (0..node_count)
        .map(|_| cursor.read_fixed_text(ID_WIDTH))
        .collect::<Result<Vec<_>, _>>()?;

    cursor.ensure((link_count * (ID_WIDTH + 12)) as u64)?;
    let link_ids = (0..link_count)
        .map(|_| cursor.read_fixed_text(ID_WIDTH))
        .collect::<Result<Vec<_>, _>>()?;
    let starts = read_indices(cursor, link_count, "link start node", node_count)?;
    let ends   = read_indices(cursor, link_count, "link end node", node_count)?;
    let kinds = (0..link_count)
        .map(|_| cursor.read_i32().map(LinkType::from_code))
        .collect::<Result<Vec<_>, _>>()?;

    cursor.ensure((tank_count * 8) as u64)?;
    let tank_nodes = read_indices(cursor, tank_count, "tank/reservoir node", node_count)?;
    let areas      = read_floats(cursor, tank_count)?;

    cursor.ensure((node_count * 4 + link_count * 8) as u64)?;
    let elevations = read_floats(cursor, node_count)?;
    let lengths    = read_floats(cursor, link_count)?;
    let diameters  = read_floats(cursor, link_count)?;

    let nodes = node_ids.into_iter()
        .zip(elevations)
        .map(|(id, elevation)| Node { id, elevation })
        .collect();

    let links = link_ids.into_iter()
        .zip(starts)
        .zip(ends)
        .zip(kinds)
        .zip(lengths.into_iter().zip(diameters))
        .map(|((((id, start), end), kind), (length, diameter))| Link {
            id, start, end, kind, length, diameter,
        })
        .collect();

    let tanks = tank_nodes.into_iter()
        .zip(areas)
        .map(|(node, area)| TankReservoir { node, area })
        .collect();

    Ok(Prolog::new(header, nodes, links, tanks))
}

fn read_indices<R: Read + Seek>(
    cursor: &mut Cursor<R>,
    count:  usize,
    what:   &'static str,
    len:    usize,
) -> Result<Vec<usize>, DecodeError> {
    (0..count)
        .map(|_| cursor.read_i32().and_then(|raw| rebase(raw, what, len)))
        .collect()
}

fn read_floats<R: Read + Seek>(cursor: &mut Cursor<R>, count: usize) -> Result<Vec<f32>, DecodeError> {
    (0..count).map(|_| cursor.read_f32()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use crate::writer::test_support::sample_file;

    fn cursor(bytes: Vec<u8>) -> Cursor<std::io::Cursor<Vec<u8>>> {
        Cursor::new(std::io::Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn decodes_sample_prolog() {
        let (bytes, expected) = sample_file();
        let mut c = cursor(bytes);
        let p = decode_prolog(&mut c, expected.prolog.magic()).unwrap();

        assert_eq!(p, expected.prolog);
        assert_eq!(p.node_count(), 2);
        assert_eq!(p.reservoir_count(), 1);
        assert_eq!(p.tank_count(), 0);
        assert_eq!(p.junction_count(), 1);
        assert_eq!(p.node_kind(1), NodeKind::Reservoir);
        assert_eq!(p.links[0].start, 0);
        assert_eq!(p.links[0].end, 1);
        assert_eq!(c.position(), 884 + 36 * 2 + 52 + 8);
    }

    #[test]
    fn magic_mismatch_stops_before_header() {
        let (bytes, expected) = sample_file();
        let mut c = cursor(bytes);
        let err = decode_prolog(&mut c, expected.prolog.magic() ^ 1).unwrap_err();
        assert!(matches!(err, DecodeError::FormatMismatch { .. }));
        assert_eq!(c.position(), 4);
    }

    #[test]
    fn out_of_range_endpoint_is_rejected() {
        let (mut bytes, expected) = sample_file();
        // First link start index sits after the header and both ID tables.
        let off = 884 + 32 * 2 + 32;
        bytes[off..off + 4].copy_from_slice(&3i32.to_le_bytes());
        let err = decode_prolog(&mut cursor(bytes), expected.prolog.magic()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::IndexOutOfRange { what: "link start node", index: 2, len: 2 }
        ));
    }
}
