//! Scanning the relocation tables for the GOT/PLT slots of an import.

use crate::{
    defs::{read_rel_entry, ElfClass, ElfRelEntry, R_386_32, R_386_GLOB_DAT, R_386_JMP_SLOT},
    info::ElfInfo,
};
use alloc::vec::Vec;
use elf::abi::{
    R_AARCH64_ABS64, R_AARCH64_GLOB_DAT, R_AARCH64_JUMP_SLOT, R_ARM_ABS32, R_ARM_GLOB_DAT,
    R_ARM_JUMP_SLOT, R_X86_64_64, R_X86_64_GLOB_DAT, R_X86_64_JUMP_SLOT,
};

/// One relocation table, held as the suffix of the attached range that
/// starts at the table base. `is_rela` picks the record stride; the
/// entry count comes from the matching size tag, divided by that stride.
pub(crate) struct ElfRelocTable<'data> {
    data: &'data [u8],
    count: usize,
    class: ElfClass,
    is_rela: bool,
}

impl<'data> ElfRelocTable<'data> {
    pub(crate) fn new(
        image: &'data [u8],
        base: usize,
        bytes: u64,
        class: ElfClass,
        is_rela: bool,
    ) -> Option<Self> {
        let data = image.get(base..)?;
        let entsize = if is_rela { class.rela_size() } else { class.rel_size() };
        Some(ElfRelocTable {
            data,
            count: bytes as usize / entsize,
            class,
            is_rela,
        })
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn entry(&self, index: usize) -> Option<ElfRelEntry> {
        if index >= self.count {
            return None;
        }
        let entsize = if self.is_rela {
            self.class.rela_size()
        } else {
            self.class.rel_size()
        };
        read_rel_entry(self.data, index.checked_mul(entsize)?, self.class)
    }
}

/// Jump-slot relocation types per class; the dynamic linker writes the
/// resolved import address through these.
fn is_jump_slot(class: ElfClass, r_type: u32) -> bool {
    match class {
        ElfClass::Elf32 => r_type == R_ARM_JUMP_SLOT || r_type == R_386_JMP_SLOT,
        ElfClass::Elf64 => r_type == R_AARCH64_JUMP_SLOT || r_type == R_X86_64_JUMP_SLOT,
        ElfClass::None => false,
    }
}

/// Absolute-data relocation types per class; a single import may be
/// referenced from several data slots.
fn is_data_reloc(class: ElfClass, r_type: u32) -> bool {
    match class {
        ElfClass::Elf32 => {
            r_type == R_ARM_ABS32
                || r_type == R_ARM_GLOB_DAT
                || r_type == R_386_32
                || r_type == R_386_GLOB_DAT
        }
        ElfClass::Elf64 => {
            r_type == R_AARCH64_ABS64
                || r_type == R_AARCH64_GLOB_DAT
                || r_type == R_X86_64_64
                || r_type == R_X86_64_GLOB_DAT
        }
        ElfClass::None => false,
    }
}

/// Collects the load-relative offsets of every GOT/PLT slot that
/// references the dynamic symbol at `symidx`: the first matching
/// jump-slot record of `relplt`, then every matching data record of the
/// dynamic relocation table selected by `use_rela`, in table order.
pub(crate) fn symbol_got_offsets(info: &ElfInfo<'_>, symidx: u32) -> Vec<u64> {
    let mut result = Vec::new();
    if let Some(relplt) = info.relplt.as_ref() {
        for i in 0..relplt.count() {
            let Some(rel) = relplt.entry(i) else {
                break;
            };
            if rel.r_sym == symidx && is_jump_slot(info.elf_class, rel.r_type) {
                result.push(rel.r_offset.wrapping_sub(info.load_bias));
                // at most one jump slot per import
                break;
            }
        }
    }
    let dynrel = if info.use_rela {
        info.reladyn.as_ref()
    } else {
        info.reldyn.as_ref()
    };
    if let Some(table) = dynrel {
        for i in 0..table.count() {
            let Some(rel) = table.entry(i) else {
                break;
            };
            if rel.r_sym == symidx && is_data_reloc(info.elf_class, rel.r_type) {
                result.push(rel.r_offset.wrapping_sub(info.load_bias));
            }
        }
    }
    result
}
