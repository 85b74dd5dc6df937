use std::io::{Read, Seek};

use super::TRAILER_SIZE;
use crate::cursor::{Cursor, DecodeError};
use crate::model::{Epilog, Trailer};

/// Read the last 12 bytes of the file (period count, warning flag, magic).
/// Leaves the cursor at end of file.
pub fn probe_trailer<R: Read + Seek>(cursor: &mut Cursor<R>) -> Result<Trailer, DecodeError> {
    cursor.seek_from_end(TRAILER_SIZE)?;
    Ok(Trailer {
        period_count: cursor.read_count("period count")?,
        warning_flag: cursor.read_i32()?,
        magic:        cursor.read_i32()?,
    })
}

/// Decode the epilog and check it against the values seen earlier: the period
/// count from the trailer probe and the prolog's magic number.
///
/// All seven fields are read before any check, so a short file fails as a
/// truncation rather than as a mismatch on a misaligned field.
pub fn decode_epilog<R: Read + Seek>(
    cursor:      &mut Cursor<R>,
    trailer:     &Trailer,
    prolog_magic: i32,
) -> Result<Epilog, DecodeError> {
    let avg_bulk_reaction_rate = cursor.read_f32()?;
    let avg_wall_reaction_rate = cursor.read_f32()?;
    let avg_tank_reaction_rate = cursor.read_f32()?;
    let avg_source_inflow_rate = cursor.read_f32()?;
    let periods                = cursor.read_i32()?;
    let warning_flag           = cursor.read_i32()?;
    let magic                  = cursor.read_i32()?;

    if i64::from(periods) != trailer.period_count as i64 {
        return Err(DecodeError::ConsistencyMismatch {
            what:     "epilog period count",
            expected: trailer.period_count as i64,
            found:    i64::from(periods),
        });
    }
    if magic != prolog_magic {
        return Err(DecodeError::ConsistencyMismatch {
            what:     "epilog magic number",
            expected: i64::from(prolog_magic),
            found:    i64::from(magic),
        });
    }

    Ok(Epilog {
        avg_bulk_reaction_rate,
        avg_wall_reaction_rate,
        avg_tank_reaction_rate,
        avg_source_inflow_rate,
        period_count: trailer.period_count,
        warning_flag,
        magic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::EPILOG_SIZE;
    use crate::writer::test_support::sample_file;

    fn at_epilog(bytes: Vec<u8>) -> Cursor<std::io::Cursor<Vec<u8>>> {
        let mut c = Cursor::new(std::io::Cursor::new(bytes)).unwrap();
        c.seek_from_end(EPILOG_SIZE).unwrap();
        c
    }

    #[test]
    fn probe_reads_tail_fields() {
        let (bytes, expected) = sample_file();
        let mut c = Cursor::new(std::io::Cursor::new(bytes)).unwrap();
        let t = probe_trailer(&mut c).unwrap();
        assert_eq!(t.period_count, 1);
        assert_eq!(t.magic, expected.prolog.magic());
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn decodes_and_cross_checks() {
        let (bytes, expected) = sample_file();
        let trailer = Trailer { period_count: 1, warning_flag: 0, magic: expected.epilog.magic };
        let e = decode_epilog(&mut at_epilog(bytes), &trailer, expected.prolog.magic()).unwrap();
        assert_eq!(e, expected.epilog);
    }

    #[test]
    fn period_count_disagreement_is_fatal() {
        let (bytes, expected) = sample_file();
        let trailer = Trailer { period_count: 5, warning_flag: 0, magic: expected.epilog.magic };
        let err = decode_epilog(&mut at_epilog(bytes), &trailer, expected.prolog.magic()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ConsistencyMismatch { what: "epilog period count", expected: 5, found: 1 }
        ));
    }

    #[test]
    fn magic_disagreement_is_fatal() {
        let (bytes, expected) = sample_file();
        let trailer = Trailer { period_count: 1, warning_flag: 0, magic: expected.epilog.magic };
        let err = decode_epilog(&mut at_epilog(bytes), &trailer, 7).unwrap_err();
        assert!(matches!(err, DecodeError::ConsistencyMismatch { what: "epilog magic number", .. }));
    }
}
