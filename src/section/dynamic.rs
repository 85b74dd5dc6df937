use std::io::{Read, Seek};

use crate::cursor::{Cursor, DecodeError};
use crate::model::{PeriodResult, Prolog};

/// Decode `period_count` reporting periods.
///
/// Each period is 4 node-sized float groups followed by 8 link-sized groups.
/// The groups carry no tags, so the read order below is the format.
/// `on_period(done, total)` is called after each period is appended.
pub fn decode_dynamic_results<R, F>(
    cursor:       &mut Cursor<R>,
    prolog:       &Prolog,
    period_count: usize,
    mut on_period: F,
) -> Result<Vec<PeriodResult>, DecodeError>
where
    R: Read + Seek,
    F: FnMut(usize, usize),
{
    let nodes = prolog.node_count();
    let links = prolog.link_count();
    let period_bytes = (16 * nodes + 32 * links) as u64;

    // Empty periods take no bytes, so their count cannot be checked against the file.
    if period_bytes == 0 && period_count > 0 {
        return Err(DecodeError::InvalidCount {
            what:   "period count for a network with no nodes or links",
            value:  i32::try_from(period_count).unwrap_or(i32::MAX),
            offset: cursor.position(),
        });
    }
    let fits = cursor.remaining().checked_div(period_bytes).unwrap_or(0);
    let mut periods = Vec::with_capacity(period_count.min(usize::try_from(fits).unwrap_or(usize::MAX)));
    for done in 0..period_count {
        cursor.ensure(period_bytes)?;
        periods.push(PeriodResult {
            node_demand:            read_group(cursor, nodes)?,
            node_head:              read_group(cursor, nodes)?,
            node_pressure:          read_group(cursor, nodes)?,
            node_water_quality:     read_group(cursor, nodes)?,
            link_flow:              read_group(cursor, links)?,
            link_velocity:          read_group(cursor, links)?,
            link_headloss:          read_group(cursor, links)?,
            link_avg_water_quality: read_group(cursor, links)?,
            link_status:            read_group(cursor, links)?,
            link_setting:           read_group(cursor, links)?,
            link_reaction_rate:     read_group(cursor, links)?,
            link_friction_factor:   read_group(cursor, links)?,
        });
        on_period(done + 1, period_count);
    }
    Ok(periods)
}

fn read_group<R: Read + Seek>(cursor: &mut Cursor<R>, count: usize) -> Result<Vec<f32>, DecodeError> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read_f32()?);
    }
    Ok(values)
}
