//! ELF header validation and field decode.

use crate::{
    defs::{read_u16, read_u32, read_u64, ElfClass},
    error::parse_ehdr_error,
    Result,
};
use elf::abi::{EI_CLASS, ELFMAG0, ELFMAG1, ELFMAG2, ELFMAG3};

pub(crate) const ELFMAGIC: [u8; 4] = [ELFMAG0, ELFMAG1, ELFMAG2, ELFMAG3];

/// The attach contract requires 64 bytes up front, covering the larger
/// Elf64 header, so the class byte can be trusted before the class is
/// known.
pub(crate) const EHDR_MIN_SIZE: usize = 64;

/// Header fields the walkers need, widened to 64 bits.
pub(crate) struct ElfHeader {
    pub class: ElfClass,
    pub machine: u16,
    pub phoff: u64,
    pub phentsize: u16,
    pub phnum: u16,
    pub shoff: u64,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl ElfHeader {
    pub(crate) fn parse(data: &[u8]) -> Result<ElfHeader> {
        if data.len() < EHDR_MIN_SIZE {
            return Err(parse_ehdr_error("image shorter than an ELF header"));
        }
        if data[..4] != ELFMAGIC {
            return Err(parse_ehdr_error("invalid ELF magic"));
        }
        let class = ElfClass::from_ident(data[EI_CLASS]);
        if class == ElfClass::None {
            return Err(parse_ehdr_error("unknown ELF file class"));
        }
        // every field below sits inside the 64 bytes checked above
        let truncated = || parse_ehdr_error("truncated ELF header");
        let u16_at = |offset| read_u16(data, offset).ok_or_else(truncated);
        let machine = u16_at(18)?;
        if class.is_64() {
            Ok(ElfHeader {
                class,
                machine,
                phoff: read_u64(data, 32).ok_or_else(truncated)?,
                shoff: read_u64(data, 40).ok_or_else(truncated)?,
                phentsize: u16_at(54)?,
                phnum: u16_at(56)?,
                shentsize: u16_at(58)?,
                shnum: u16_at(60)?,
                shstrndx: u16_at(62)?,
            })
        } else {
            Ok(ElfHeader {
                class,
                machine,
                phoff: read_u32(data, 28).ok_or_else(truncated)?.into(),
                shoff: read_u32(data, 32).ok_or_else(truncated)?.into(),
                phentsize: u16_at(42)?,
                phnum: u16_at(44)?,
                shentsize: u16_at(46)?,
                shnum: u16_at(48)?,
                shstrndx: u16_at(50)?,
            })
        }
    }
}
