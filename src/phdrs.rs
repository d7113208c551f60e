//! Program header walk: load span and PT_DYNAMIC discovery.

use crate::{
    defs::{read_phdr, ElfPhdr},
    ehdr::ElfHeader,
};
use elf::abi::{PT_DYNAMIC, PT_LOAD, PT_PHDR};

/// Results of one pass over the program headers.
pub(crate) struct ElfPhdrs {
    /// Minimum `p_vaddr` across the PT_LOAD segments; zero without one.
    pub load_bias: u64,
    /// `max(p_vaddr + p_memsz) - load_bias` across the PT_LOAD segments.
    pub loaded_size: usize,
    pub dynamic: Option<ElfPhdr>,
}

impl ElfPhdrs {
    pub(crate) fn parse(data: &[u8], header: &ElfHeader) -> ElfPhdrs {
        let mut first_load = u64::MAX;
        let mut last_load = 0u64;
        let mut dynamic = None;
        if header.phoff != 0 {
            for i in 0..header.phnum as usize {
                let Some(offset) = (header.phoff as usize).checked_add(i * header.phentsize as usize)
                else {
                    break;
                };
                let Some(phdr) = read_phdr(data, offset, header.class) else {
                    break;
                };
                match phdr.p_type {
                    // self-describing entry, carries no tables
                    PT_PHDR => {}
                    PT_DYNAMIC => dynamic = Some(phdr),
                    PT_LOAD => {
                        first_load = first_load.min(phdr.p_vaddr);
                        last_load = last_load.max(phdr.p_vaddr.saturating_add(phdr.p_memsz));
                    }
                    _ => {}
                }
            }
        }
        if first_load == u64::MAX {
            // no PT_LOAD, the image occupies no load span
            first_load = 0;
            last_load = 0;
        }
        ElfPhdrs {
            load_bias: first_load,
            loaded_size: last_load.saturating_sub(first_load) as usize,
            dynamic,
        }
    }
}
