//! Unified record views over the two ELF word sizes.
//!
//! The walkers never cast raw bytes to structs; every record is decoded
//! field by field through the bounds-checked readers below, widened to
//! 64 bits, so one algorithm body serves both classes.

use elf::abi::{ELFCLASS32, ELFCLASS64};

/// Word size of an attached image.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ElfClass {
    /// Not attached, or the image failed validation.
    #[default]
    None,
    Elf32,
    Elf64,
}

impl ElfClass {
    pub(crate) fn from_ident(class: u8) -> Self {
        match class {
            ELFCLASS32 => ElfClass::Elf32,
            ELFCLASS64 => ElfClass::Elf64,
            _ => ElfClass::None,
        }
    }

    /// 4 on [`ElfClass::Elf32`], 8 on [`ElfClass::Elf64`], 0 otherwise.
    pub fn pointer_size(self) -> usize {
        match self {
            ElfClass::None => 0,
            ElfClass::Elf32 => 4,
            ElfClass::Elf64 => 8,
        }
    }

    #[inline]
    pub(crate) fn is_64(self) -> bool {
        self == ElfClass::Elf64
    }

    #[inline]
    pub(crate) fn dyn_size(self) -> usize {
        if self.is_64() { 16 } else { 8 }
    }

    #[inline]
    pub(crate) fn sym_size(self) -> usize {
        if self.is_64() { 24 } else { 16 }
    }

    #[inline]
    pub(crate) fn rel_size(self) -> usize {
        if self.is_64() { 16 } else { 8 }
    }

    #[inline]
    pub(crate) fn rela_size(self) -> usize {
        if self.is_64() { 24 } else { 12 }
    }
}

// The abi module of the `elf` crate carries the arm, aarch64 and x86_64
// psABI relocation numbers but not the i386 ones.
pub(crate) const R_386_32: u32 = 1;
pub(crate) const R_386_GLOB_DAT: u32 = 6;
pub(crate) const R_386_JMP_SLOT: u32 = 7;

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    Some(u16::from_ne_bytes(data.get(offset..end)?.try_into().ok()?))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    Some(u32::from_ne_bytes(data.get(offset..end)?.try_into().ok()?))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let end = offset.checked_add(8)?;
    Some(u64::from_ne_bytes(data.get(offset..end)?.try_into().ok()?))
}

/// Program header fields the walkers consume.
pub(crate) struct ElfPhdr {
    pub p_type: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_memsz: u64,
}

pub(crate) fn read_phdr(data: &[u8], offset: usize, class: ElfClass) -> Option<ElfPhdr> {
    if class.is_64() {
        Some(ElfPhdr {
            p_type: read_u32(data, offset)?,
            p_offset: read_u64(data, offset.checked_add(8)?)?,
            p_vaddr: read_u64(data, offset.checked_add(16)?)?,
            p_memsz: read_u64(data, offset.checked_add(40)?)?,
        })
    } else {
        Some(ElfPhdr {
            p_type: read_u32(data, offset)?,
            p_offset: read_u32(data, offset.checked_add(4)?)?.into(),
            p_vaddr: read_u32(data, offset.checked_add(8)?)?.into(),
            p_memsz: read_u32(data, offset.checked_add(20)?)?.into(),
        })
    }
}

/// Section header fields the walkers consume.
pub(crate) struct ElfShdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
}

impl ElfShdr {
    /// Start of the section data within the attached range.
    #[inline]
    pub(crate) fn location(&self, is_loaded: bool) -> u64 {
        if is_loaded { self.sh_addr } else { self.sh_offset }
    }
}

pub(crate) fn read_shdr(data: &[u8], offset: usize, class: ElfClass) -> Option<ElfShdr> {
    if class.is_64() {
        Some(ElfShdr {
            sh_name: read_u32(data, offset)?,
            sh_type: read_u32(data, offset.checked_add(4)?)?,
            sh_addr: read_u64(data, offset.checked_add(16)?)?,
            sh_offset: read_u64(data, offset.checked_add(24)?)?,
            sh_size: read_u64(data, offset.checked_add(32)?)?,
        })
    } else {
        Some(ElfShdr {
            sh_name: read_u32(data, offset)?,
            sh_type: read_u32(data, offset.checked_add(4)?)?,
            sh_addr: read_u32(data, offset.checked_add(12)?)?.into(),
            sh_offset: read_u32(data, offset.checked_add(16)?)?.into(),
            sh_size: read_u32(data, offset.checked_add(20)?)?.into(),
        })
    }
}

/// One `.dynamic` entry.
pub(crate) struct ElfDyn {
    pub d_tag: i64,
    pub d_val: u64,
}

pub(crate) fn read_dyn(data: &[u8], offset: usize, class: ElfClass) -> Option<ElfDyn> {
    if class.is_64() {
        Some(ElfDyn {
            d_tag: read_u64(data, offset)? as i64,
            d_val: read_u64(data, offset.checked_add(8)?)?,
        })
    } else {
        Some(ElfDyn {
            d_tag: (read_u32(data, offset)? as i32).into(),
            d_val: read_u32(data, offset.checked_add(4)?)?.into(),
        })
    }
}

/// Symbol table entry fields the lookups consume.
#[derive(Clone, Copy)]
pub(crate) struct ElfSym {
    pub st_name: u32,
    pub st_value: u64,
}

pub(crate) fn read_sym(data: &[u8], offset: usize, class: ElfClass) -> Option<ElfSym> {
    if class.is_64() {
        Some(ElfSym {
            st_name: read_u32(data, offset)?,
            st_value: read_u64(data, offset.checked_add(8)?)?,
        })
    } else {
        Some(ElfSym {
            st_name: read_u32(data, offset)?,
            st_value: read_u32(data, offset.checked_add(4)?)?.into(),
        })
    }
}

/// One relocation record with `r_info` split into its two halves. The
/// leading fields are laid out identically in the REL and RELA shapes, so
/// a single reader serves both; only the record stride differs.
pub(crate) struct ElfRelEntry {
    pub r_offset: u64,
    pub r_sym: u32,
    pub r_type: u32,
}

pub(crate) fn read_rel_entry(data: &[u8], offset: usize, class: ElfClass) -> Option<ElfRelEntry> {
    if class.is_64() {
        let r_offset = read_u64(data, offset)?;
        let r_info = read_u64(data, offset.checked_add(8)?)?;
        Some(ElfRelEntry {
            r_offset,
            r_sym: (r_info >> 32) as u32,
            r_type: r_info as u32,
        })
    } else {
        let r_offset = read_u32(data, offset)?;
        let r_info = read_u32(data, offset.checked_add(4)?)?;
        Some(ElfRelEntry {
            r_offset: r_offset.into(),
            r_sym: r_info >> 8,
            r_type: r_info & 0xff,
        })
    }
}
