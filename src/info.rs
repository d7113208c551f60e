//! The parsed descriptor built once per attach.

use crate::{
    defs::ElfClass,
    dynamic::ElfRawDynamic,
    ehdr::ElfHeader,
    hash::sysv::ElfHash,
    phdrs::ElfPhdrs,
    relocation::ElfRelocTable,
    shdrs,
    symbol::{ElfStringTable, SymbolTable},
    Result,
};
use alloc::string::String;
use hashbrown::HashMap;

/// Everything the queries need, resolved to interior borrows of the
/// attached range. Built by [`ElfInfo::parse`] and only extended
/// afterwards by the mini-debug loader filling
/// `compressed_debug_symbols`.
#[derive(Default)]
pub(crate) struct ElfInfo<'data> {
    pub elf_class: ElfClass,
    /// `e_machine`, copied verbatim.
    pub machine: u16,
    /// `DT_SONAME` resolved through `DT_STRTAB`; empty if either is absent.
    pub soname: String,
    /// Minimum `p_vaddr` across the PT_LOAD segments.
    pub load_bias: u64,
    pub loaded_size: usize,
    /// `.hash`
    pub sysv_hash: Option<ElfHash<'data>>,
    /// `.gnu.hash`, raw; the substructure is re-derived per lookup.
    pub gnu_hash: Option<&'data [u8]>,
    /// `.dynsym`
    pub dynsym: Option<SymbolTable<'data>>,
    /// `.dynstr`
    pub dynstr: Option<ElfStringTable<'data>>,
    /// `.symtab`; absent in stripped objects.
    pub symtab: Option<SymbolTable<'data>>,
    /// `.strtab`
    pub strtab: Option<ElfStringTable<'data>>,
    /// `DT_PLTREL == DT_RELA`; one record shape governs all three
    /// relocation tables of an image.
    pub use_rela: bool,
    /// `DT_REL` / `DT_RELSZ`
    pub reldyn: Option<ElfRelocTable<'data>>,
    /// `DT_RELA` / `DT_RELASZ`
    pub reladyn: Option<ElfRelocTable<'data>>,
    /// `DT_JMPREL` / `DT_PLTRELSZ`
    pub relplt: Option<ElfRelocTable<'data>>,
    /// `.gnu_debugdata`, file form only.
    pub mini_debug_info: Option<&'data [u8]>,
    /// Symbols of the decompressed mini-debug image, keyed by name with
    /// the raw `st_value`; the outer load bias is applied at query time.
    pub compressed_debug_symbols: HashMap<String, u64>,
}

impl<'data> ElfInfo<'data> {
    pub(crate) fn parse(data: &'data [u8], is_loaded: bool) -> Result<ElfInfo<'data>> {
        let header = ElfHeader::parse(data)?;
        let mut info = ElfInfo {
            elf_class: header.class,
            machine: header.machine,
            ..ElfInfo::default()
        };
        let phdrs = ElfPhdrs::parse(data, &header);
        info.load_bias = phdrs.load_bias;
        info.loaded_size = phdrs.loaded_size;
        if let Some(dynamic) = phdrs.dynamic {
            let base = if is_loaded {
                dynamic.p_vaddr as usize
            } else {
                dynamic.p_offset as usize
            };
            let raw = ElfRawDynamic::parse(data, header.class, base, dynamic.p_memsz as usize);
            info.use_rela = raw.use_rela;
            // dynamic-tag table pointers are taken as image-relative in
            // both forms; see DESIGN.md on this addressing
            if let Some(off) = raw.rel_off {
                info.reldyn =
                    ElfRelocTable::new(data, off as usize, raw.rel_bytes, header.class, false);
            }
            if let Some(off) = raw.rela_off {
                info.reladyn =
                    ElfRelocTable::new(data, off as usize, raw.rela_bytes, header.class, true);
            }
            if let Some(off) = raw.pltrel_off {
                info.relplt = ElfRelocTable::new(
                    data,
                    off as usize,
                    raw.pltrel_bytes,
                    header.class,
                    raw.use_rela,
                );
            }
            if raw.soname_off != 0 {
                if let Some(strtab_off) = raw.strtab_off {
                    let table = data.get(strtab_off as usize..).map(ElfStringTable::new);
                    if let Some(name) = table.and_then(|table| {
                        table
                            .get_str(raw.soname_off as usize)
                            .map(String::from)
                    }) {
                        info.soname = name;
                    }
                }
            }
        }
        shdrs::parse(data, &header, is_loaded, &mut info);
        Ok(info)
    }
}
