#![cfg_attr(not(feature = "std"), no_std)]
//! Inspect ELF shared objects without loading them.
//!
//! [`ElfView`] attaches to a borrowed byte range holding either a raw
//! on-disk image ([`ElfView::attach_file_mem_mapping`]) or the memory of
//! an object the loader has already placed
//! ([`ElfView::attach_loaded_memory_view`]), and answers three kinds of
//! question:
//!
//! * identity: file class, machine, soname, load bias and loaded size;
//! * where a named symbol lives, as an offset relative to the load bias,
//!   resolved through the GNU/SysV hash tables, the debug symbol table,
//!   and the XZ-compressed `.gnu_debugdata` side table;
//! * which GOT/PLT slots reference a named import, found by scanning the
//!   jump-slot and absolute-data relocation records.
//!
//! All queries are total: an invalid image, a missing table or a missing
//! symbol yields `0`, an empty string or an empty vector, never an
//! error. The view borrows the attached range and holds interior
//! references into it, so the range must outlive the view; the borrow
//! checker enforces that.
//!
//! ```no_run
//! use elf_view::ElfView;
//!
//! let bytes: &[u8] = &[]; // in practice, a memory-mapped .so file
//! let mut view = ElfView::new();
//! view.attach_file_mem_mapping(bytes);
//! if view.is_valid() {
//!     let offset = view.symbol_offset("malloc");
//!     let got = view.symbol_got_offsets("free");
//!     let _ = (offset, got);
//! }
//! ```

extern crate alloc;

mod defs;
mod dynamic;
mod ehdr;
mod error;
mod hash;
mod info;
mod minidebug;
mod phdrs;
mod relocation;
mod shdrs;
mod symbol;

use alloc::vec::Vec;
use core::fmt::Debug;

use info::ElfInfo;

pub use defs::ElfClass;
pub(crate) use error::Result;

/// A read-only view over one ELF image.
///
/// Detached by default; [`attach_file_mem_mapping`] and
/// [`attach_loaded_memory_view`] parse the image and build the lookup
/// tables, re-attaching discards the previous state wholesale, and
/// [`detach`] returns the view to the invalid state. Queries on an
/// invalid view answer with their miss sentinels.
///
/// [`attach_file_mem_mapping`]: ElfView::attach_file_mem_mapping
/// [`attach_loaded_memory_view`]: ElfView::attach_loaded_memory_view
/// [`detach`]: ElfView::detach
pub struct ElfView<'data> {
    memory: &'data [u8],
    is_loaded: bool,
    info: ElfInfo<'data>,
}

impl Default for ElfView<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ElfView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElfView")
            .field("class", &self.info.elf_class)
            .field("machine", &self.info.machine)
            .field("soname", &self.info.soname)
            .field("loaded", &self.is_loaded)
            .finish()
    }
}

impl<'data> ElfView<'data> {
    /// Creates a detached view.
    pub fn new() -> Self {
        ElfView {
            memory: &[],
            is_loaded: false,
            info: ElfInfo::default(),
        }
    }

    /// Attaches to the raw bytes of an ELF file, e.g. a memory mapping
    /// of it. Section and segment data are addressed by their file
    /// offsets, and `.gnu_debugdata` is decoded if present.
    pub fn attach_file_mem_mapping(&mut self, file_map: &'data [u8]) {
        self.attach(file_map, false);
    }

    /// Attaches to the in-process memory of an object the loader has
    /// placed. Section and segment data are addressed by their virtual
    /// addresses; `.gnu_debugdata` is not mapped and is skipped.
    pub fn attach_loaded_memory_view(&mut self, memory: &'data [u8]) {
        self.attach(memory, true);
    }

    fn attach(&mut self, memory: &'data [u8], is_loaded: bool) {
        self.memory = memory;
        self.is_loaded = is_loaded;
        self.info = match ElfInfo::parse(memory, is_loaded) {
            Ok(info) => info,
            Err(err) => {
                log::debug!("attach: not a usable ELF image: {err}");
                ElfInfo::default()
            }
        };
        if !is_loaded {
            if let Some(mini) = self.info.mini_debug_info {
                minidebug::parse_mini_debug_info(mini, &mut self.info.compressed_debug_symbols);
            }
        }
    }

    /// Drops the attached range and every table derived from it.
    pub fn detach(&mut self) {
        self.memory = &[];
        self.is_loaded = false;
        self.info = ElfInfo::default();
    }

    /// True when memory is attached and the header parsed as ELF32 or
    /// ELF64.
    pub fn is_valid(&self) -> bool {
        !self.memory.is_empty() && self.info.elf_class != ElfClass::None
    }

    /// Whether the view was attached as a loaded memory image.
    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// File class of the attached image; [`ElfClass::None`] when invalid.
    pub fn elf_class(&self) -> ElfClass {
        self.info.elf_class
    }

    /// 4 or 8 depending on the file class, 0 when invalid.
    pub fn pointer_size(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        self.info.elf_class.pointer_size()
    }

    /// Raw `e_machine` of the attached image, 0 when invalid.
    pub fn architecture(&self) -> u16 {
        if !self.is_valid() {
            return 0;
        }
        self.info.machine
    }

    /// Minimum `p_vaddr` across the PT_LOAD segments. Every offset the
    /// queries return already has this subtracted; the raw value is
    /// rarely needed.
    pub fn load_bias(&self) -> u64 {
        self.info.load_bias
    }

    /// Span covered by the PT_LOAD segments.
    pub fn loaded_size(&self) -> usize {
        self.info.loaded_size
    }

    /// `DT_SONAME`, resolved through the dynamic string table. May be
    /// empty.
    pub fn soname(&self) -> &str {
        &self.info.soname
    }

    /// Load-relative offset of `symbol`, or 0 when absent.
    ///
    /// Searched in order: the dynamic symbol table (GNU hash, SysV hash,
    /// then a whole-table scan), the debug symbol table, and the
    /// mini-debug map.
    pub fn symbol_offset(&self, symbol: &str) -> u64 {
        if symbol.is_empty() || !self.is_valid() {
            return 0;
        }
        let name = symbol.as_bytes();
        if let Some((_, sym)) = symbol::dynamic_symbol_index(&self.info, name, false) {
            return sym.st_value.wrapping_sub(self.info.load_bias);
        }
        if let Some(sym) = symbol::non_dynamic_symbol(&self.info, name) {
            return sym.st_value.wrapping_sub(self.info.load_bias);
        }
        if let Some(value) = self.info.compressed_debug_symbols.get(symbol) {
            return value.wrapping_sub(self.info.load_bias);
        }
        0
    }

    /// Load-relative offset of the first symbol whose name starts with
    /// `prefix`, or 0 when none does. `.dynsym` is scanned first, then
    /// `.symtab`, then the mini-debug map; the comparison is byte-wise,
    /// mangled names are matched as-is.
    pub fn first_symbol_offset_with_prefix(&self, prefix: &str) -> u64 {
        if prefix.is_empty() || !self.is_valid() {
            return 0;
        }
        if let Some(sym) = symbol::first_symbol_with_prefix(&self.info, prefix.as_bytes()) {
            return sym.st_value.wrapping_sub(self.info.load_bias);
        }
        for (name, value) in &self.info.compressed_debug_symbols {
            if name.as_bytes().starts_with(prefix.as_bytes()) {
                return value.wrapping_sub(self.info.load_bias);
            }
        }
        0
    }

    /// Load-relative offsets of the GOT/PLT slots that reference the
    /// imported `symbol`: the jump slot first if one exists, then the
    /// matching data relocations in table order. Empty when the symbol
    /// has no dynamic entry or nothing references it.
    pub fn symbol_got_offsets(&self, symbol: &str) -> Vec<u64> {
        if symbol.is_empty() || !self.is_valid() {
            return Vec::new();
        }
        // imports carry no value, only their table index matters; the
        // GNU hash omits undefined symbols so this search is linear
        let Some((index, _)) = symbol::dynamic_symbol_index(&self.info, symbol.as_bytes(), true)
        else {
            return Vec::new();
        };
        relocation::symbol_got_offsets(&self.info, index)
    }
}
