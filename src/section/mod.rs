//! Section decoders.
//!
//! The output file is four back-to-back sections with no tags or lengths:
//!
//! | Section          | Size in bytes                                   |
//! |------------------|-------------------------------------------------|
//! | Prolog           | 884 + 36·Nnodes + 52·Nlinks + 8·Ntanks          |
//! | Energy use       | 28·Npumps + 4                                   |
//! | Dynamic results  | (16·Nnodes + 32·Nlinks)·Nperiods                |
//! | Epilog           | 28                                              |
//!
//! Each decoder consumes a [`Cursor`](crate::cursor::Cursor) positioned at the
//! start of its section and returns the whole section or an error; nothing is
//! published on failure.  Later sections take their counts from the prolog.
//! Only the layout introduced with 31-character IDs is supported.

mod dynamic;
mod energy;
mod epilog;
mod prolog;

pub use dynamic::decode_dynamic_results;
pub use energy::decode_energy_use;
pub use epilog::{decode_epilog, probe_trailer};
pub use prolog::decode_prolog;

use crate::cursor::DecodeError;
use serde::Serialize;

/// Width of a node or link ID field.
pub const ID_WIDTH:    usize = 32;
pub const TITLE_WIDTH: usize = 80;
pub const PATH_WIDTH:  usize = 260;
pub const CHEM_WIDTH:  usize = 32;

/// Size of the epilog, which is always the last thing in the file.
pub const EPILOG_SIZE: u64 = 28;
/// The trailer probe reads the epilog's last three fields.
pub const TRAILER_SIZE: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Prolog,
    EnergyUse,
    DynamicResults,
    Epilog,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Prolog,
        Section::EnergyUse,
        Section::DynamicResults,
        Section::Epilog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::Prolog         => "Prolog",
            Section::EnergyUse      => "EnergyUse",
            Section::DynamicResults => "DynamicResults",
            Section::Epilog         => "Epilog",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected byte size of each section for a given network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionSizes {
    pub prolog:          u64,
    pub energy_use:      u64,
    pub dynamic_results: u64,
    pub epilog:          u64,
}

impl SectionSizes {
    pub fn compute(nodes: usize, links: usize, tanks: usize, pumps: usize, periods: usize) -> Self {
        let (n, l, t, p, np) = (nodes as u64, links as u64, tanks as u64, pumps as u64, periods as u64);
        Self {
            prolog:          884 + 36 * n + 52 * l + 8 * t,
            energy_use:      28 * p + 4,
            dynamic_results: (16 * n + 32 * l) * np,
            epilog:          EPILOG_SIZE,
        }
    }

    pub fn total(&self) -> u64 {
        self.prolog + self.energy_use + self.dynamic_results + self.epilog
    }
}

/// Convert a 1-based stored index into a 0-based index below `len`.
pub(crate) fn rebase(raw: i32, what: &'static str, len: usize) -> Result<usize, DecodeError> {
    let index = i64::from(raw) - 1;
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(DecodeError::IndexOutOfRange { what, index, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_size_identity() {
        let s = SectionSizes::compute(2, 1, 1, 0, 1);
        assert_eq!(s.prolog, 884 + 72 + 52 + 8);
        assert_eq!(s.energy_use, 4);
        assert_eq!(s.dynamic_results, 32 + 32);
        assert_eq!(s.total(), 1016 + 4 + 64 + 28);
    }

    #[test]
    fn rebase_bounds() {
        assert_eq!(rebase(1, "node", 2).unwrap(), 0);
        assert_eq!(rebase(2, "node", 2).unwrap(), 1);
        assert!(matches!(rebase(0, "node", 2), Err(DecodeError::IndexOutOfRange { index: -1, .. })));
        assert!(matches!(rebase(3, "node", 2), Err(DecodeError::IndexOutOfRange { index: 2, len: 2, .. })));
    }
}
