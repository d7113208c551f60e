//! Section header walk.

use crate::{
    defs::read_shdr,
    ehdr::ElfHeader,
    hash::sysv::ElfHash,
    info::ElfInfo,
    symbol::{ElfStringTable, SymbolTable},
};
use elf::abi::{SHT_DYNSYM, SHT_GNU_HASH, SHT_HASH, SHT_PROGBITS, SHT_STRTAB, SHT_SYMTAB};

/// Walks the section headers and fills in the tables the dynamic
/// segment does not describe. A section whose data falls outside the
/// attached range is treated as absent.
pub(crate) fn parse<'data>(
    data: &'data [u8],
    header: &ElfHeader,
    is_loaded: bool,
    info: &mut ElfInfo<'data>,
) {
    if header.shoff == 0 {
        return;
    }
    let shoff = header.shoff as usize;
    let shentsize = header.shentsize as usize;
    let shdr_at = |index: usize| {
        read_shdr(
            data,
            shoff.checked_add(index.checked_mul(shentsize)?)?,
            header.class,
        )
    };
    // section names come from the header string table
    let Some(shstrtab) = shdr_at(header.shstrndx as usize) else {
        return;
    };
    let Some(names) = data
        .get(shstrtab.location(is_loaded) as usize..)
        .map(ElfStringTable::new)
    else {
        return;
    };
    for i in 0..header.shnum as usize {
        let Some(shdr) = shdr_at(i) else {
            break;
        };
        let name = names.get_bytes(shdr.sh_name as usize).unwrap_or(b"");
        let location = shdr.location(is_loaded) as usize;
        match shdr.sh_type {
            SHT_STRTAB => {
                if name == b".dynstr" {
                    info.dynstr = data.get(location..).map(ElfStringTable::new);
                } else if name == b".strtab" {
                    info.strtab = data.get(location..).map(ElfStringTable::new);
                }
            }
            SHT_SYMTAB => {
                // non-alloc section, addressed by file offset in both forms
                if name == b".symtab" {
                    info.symtab = data.get(shdr.sh_offset as usize..).map(|table| {
                        SymbolTable::new(
                            table,
                            shdr.sh_size as usize / header.class.sym_size(),
                            header.class,
                        )
                    });
                }
            }
            SHT_DYNSYM => {
                info.dynsym = data.get(location..).map(|table| {
                    SymbolTable::new(
                        table,
                        shdr.sh_size as usize / header.class.sym_size(),
                        header.class,
                    )
                });
            }
            SHT_HASH => {
                info.sysv_hash = data.get(location..).and_then(ElfHash::parse);
            }
            SHT_GNU_HASH => {
                info.gnu_hash = data.get(location..);
            }
            SHT_PROGBITS => {
                // debug data is never mapped, only the file form carries it
                if name == b".gnu_debugdata" && !is_loaded {
                    let end = (shdr.sh_offset as usize).checked_add(shdr.sh_size as usize);
                    info.mini_debug_info =
                        end.and_then(|end| data.get(shdr.sh_offset as usize..end));
                }
            }
            _ => {}
        }
    }
}
