use std::io::{Read, Seek};

use super::rebase;
use crate::cursor::{Cursor, DecodeError};
use crate::model::{EnergyUse, Prolog, PumpEnergy};

/// Bytes per pump record: one i32 link index and six f32 figures.
const PUMP_RECORD: u64 = 28;

/// Decode the energy use section: one record per pump, then the peak energy
/// usage for the whole run.
pub fn decode_energy_use<R: Read + Seek>(
    cursor: &mut Cursor<R>,
    prolog: &Prolog,
) -> Result<EnergyUse, DecodeError> {
    let count = prolog.pump_count();
    cursor.ensure(count as u64 * PUMP_RECORD + 4)?;

    let mut pumps = Vec::with_capacity(count);
    for _ in 0..count {
        pumps.push(PumpEnergy {
            link:                  rebase(cursor.read_i32()?, "pump link", prolog.link_count())?,
            utilization:           cursor.read_f32()?,
            average_efficiency:    cursor.read_f32()?,
            average_kw_per_volume: cursor.read_f32()?,
            average_kw:            cursor.read_f32()?,
            peak_kw:               cursor.read_f32()?,
            average_cost_per_day:  cursor.read_f32()?,
        });
    }
    let peak_energy_usage = cursor.read_f32()?;

    Ok(EnergyUse { pumps, peak_energy_usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::test_support::pumped_file;

    #[test]
    fn decodes_pump_records_in_order() {
        let (bytes, expected) = pumped_file();
        let mut c = Cursor::new(std::io::Cursor::new(bytes)).unwrap();
        let offset = crate::section::SectionSizes::compute(
            expected.prolog.node_count(),
            expected.prolog.link_count(),
            expected.prolog.tank_reservoir_count(),
            expected.prolog.pump_count(),
            0,
        ).prolog;
        c.seek_absolute(offset).unwrap();

        let e = decode_energy_use(&mut c, &expected.prolog).unwrap();
        assert_eq!(e, expected.energy_use);
        assert_eq!(e.pumps[0].link, 1);
        assert_eq!(c.position(), offset + 28 + 4);
    }
}
