//! Dynamic-tag walk over PT_DYNAMIC.

use crate::defs::{read_dyn, ElfClass};
use elf::abi::{
    DT_JMPREL, DT_PLTREL, DT_PLTRELSZ, DT_REL, DT_RELA, DT_RELASZ, DT_RELSZ, DT_SONAME, DT_STRTAB,
};

/// Raw values harvested from the dynamic section.
///
/// Offsets keep the image-relative values the tags carried; the byte
/// sizes stay undivided until the record shape is settled, because
/// `DT_PLTREL` may follow the size tags in table order.
pub(crate) struct ElfRawDynamic {
    /// `DT_SONAME`, an offset into the dynamic string table; 0 = absent.
    pub soname_off: u64,
    /// `DT_STRTAB`
    pub strtab_off: Option<u64>,
    /// `DT_PLTREL` names `DT_RELA`
    pub use_rela: bool,
    /// `DT_REL`
    pub rel_off: Option<u64>,
    /// `DT_RELSZ`
    pub rel_bytes: u64,
    /// `DT_RELA`
    pub rela_off: Option<u64>,
    /// `DT_RELASZ`
    pub rela_bytes: u64,
    /// `DT_JMPREL`
    pub pltrel_off: Option<u64>,
    /// `DT_PLTRELSZ`
    pub pltrel_bytes: u64,
}

impl ElfRawDynamic {
    /// Walks `bytes / size_of(Dyn)` entries starting at `base`. Entries
    /// outside the attached range end the walk; unknown tags and
    /// `DT_NULL` are skipped rather than terminating, matching the
    /// segment-sized iteration of the dynamic linker tables.
    pub(crate) fn parse(data: &[u8], class: ElfClass, base: usize, bytes: usize) -> ElfRawDynamic {
        let mut raw = ElfRawDynamic {
            soname_off: 0,
            strtab_off: None,
            use_rela: false,
            rel_off: None,
            rel_bytes: 0,
            rela_off: None,
            rela_bytes: 0,
            pltrel_off: None,
            pltrel_bytes: 0,
        };
        for i in 0..bytes / class.dyn_size() {
            let Some(offset) = base.checked_add(i * class.dyn_size()) else {
                break;
            };
            let Some(entry) = read_dyn(data, offset, class) else {
                break;
            };
            match entry.d_tag {
                DT_SONAME => raw.soname_off = entry.d_val,
                DT_STRTAB => raw.strtab_off = Some(entry.d_val),
                DT_PLTREL => raw.use_rela = entry.d_val == DT_RELA as u64,
                DT_REL => raw.rel_off = Some(entry.d_val),
                DT_RELA => raw.rela_off = Some(entry.d_val),
                DT_RELSZ => raw.rel_bytes = entry.d_val,
                DT_RELASZ => raw.rela_bytes = entry.d_val,
                DT_JMPREL => raw.pltrel_off = Some(entry.d_val),
                DT_PLTRELSZ => raw.pltrel_bytes = entry.d_val,
                _ => {}
            }
        }
        raw
    }
}
