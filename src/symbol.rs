//! String and symbol table views, and the name search paths.

use crate::{
    defs::{read_sym, ElfClass, ElfSym},
    hash::gnu::ElfGnuHash,
    info::ElfInfo,
};

/// A NUL-terminated string table, held as the suffix of the attached
/// range that starts at the table base.
pub(crate) struct ElfStringTable<'data> {
    data: &'data [u8],
}

impl<'data> ElfStringTable<'data> {
    pub(crate) const fn new(data: &'data [u8]) -> Self {
        ElfStringTable { data }
    }

    /// Bytes of the string at `offset`, without the terminator. `None`
    /// when the offset is outside the table or no terminator exists
    /// before the end of the attached range.
    pub(crate) fn get_bytes(&self, offset: usize) -> Option<&'data [u8]> {
        let tail = self.data.get(offset..)?;
        let len = tail.iter().position(|byte| *byte == 0)?;
        Some(&tail[..len])
    }

    /// UTF-8 view of the string at `offset`; non-UTF-8 names are treated
    /// as absent.
    pub(crate) fn get_str(&self, offset: usize) -> Option<&'data str> {
        core::str::from_utf8(self.get_bytes(offset)?).ok()
    }
}

/// A symbol table, held as the suffix of the attached range that starts
/// at the table base plus the entry count declared for it.
pub(crate) struct SymbolTable<'data> {
    data: &'data [u8],
    count: usize,
    class: ElfClass,
}

impl<'data> SymbolTable<'data> {
    pub(crate) fn new(data: &'data [u8], count: usize, class: ElfClass) -> Self {
        SymbolTable { data, count, class }
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Entry at `index`; `None` past the declared count or past the end
    /// of the attached range.
    pub(crate) fn symbol(&self, index: usize) -> Option<ElfSym> {
        if index >= self.count {
            return None;
        }
        read_sym(self.data, index.checked_mul(self.class.sym_size())?, self.class)
    }
}

/// Finds `name` in the dynamic symbol table and reports its index.
///
/// Probes the GNU hash table first, then the SysV one, then falls back
/// to scanning the whole table. The GNU table deliberately omits
/// undefined symbols, so searches for imports skip straight to the
/// linear scan.
pub(crate) fn dynamic_symbol_index(
    info: &ElfInfo<'_>,
    name: &[u8],
    search_for_undefined: bool,
) -> Option<(u32, ElfSym)> {
    let dynsym = info.dynsym.as_ref()?;
    let dynstr = info.dynstr.as_ref()?;
    if !search_for_undefined {
        if let Some(raw) = info.gnu_hash {
            if let Some(found) = ElfGnuHash::parse(raw, info.elf_class)
                .and_then(|hashtab| hashtab.lookup(dynsym, dynstr, name))
            {
                return Some(found);
            }
        }
        if let Some(hashtab) = info.sysv_hash.as_ref() {
            if let Some(found) = hashtab.lookup(dynsym, dynstr, name) {
                return Some(found);
            }
        }
    }
    // the hash tables may omit the symbol; scan the whole table
    for i in 0..dynsym.count() {
        let Some(sym) = dynsym.symbol(i) else {
            break;
        };
        if dynstr.get_bytes(sym.st_name as usize) == Some(name) {
            return Some((i as u32, sym));
        }
    }
    None
}

/// Exact-name scan of the non-dynamic (debug) symbol table.
pub(crate) fn non_dynamic_symbol(info: &ElfInfo<'_>, name: &[u8]) -> Option<ElfSym> {
    let symtab = info.symtab.as_ref()?;
    let strtab = info.strtab.as_ref()?;
    for i in 0..symtab.count() {
        let Some(sym) = symtab.symbol(i) else {
            break;
        };
        if strtab.get_bytes(sym.st_name as usize) == Some(name) {
            return Some(sym);
        }
    }
    None
}

/// First symbol whose name starts with `prefix`, searching `.dynsym`
/// first and `.symtab` second. Byte-wise comparison, no demangling.
pub(crate) fn first_symbol_with_prefix(info: &ElfInfo<'_>, prefix: &[u8]) -> Option<ElfSym> {
    if let (Some(dynsym), Some(dynstr)) = (info.dynsym.as_ref(), info.dynstr.as_ref()) {
        for i in 0..dynsym.count() {
            let Some(sym) = dynsym.symbol(i) else {
                break;
            };
            if let Some(symname) = dynstr.get_bytes(sym.st_name as usize) {
                if symname.starts_with(prefix) {
                    return Some(sym);
                }
            }
        }
    }
    if let (Some(symtab), Some(strtab)) = (info.symtab.as_ref(), info.strtab.as_ref()) {
        for i in 0..symtab.count() {
            let Some(sym) = symtab.symbol(i) else {
                break;
            };
            if let Some(symname) = strtab.get_bytes(sym.st_name as usize) {
                if symname.starts_with(prefix) {
                    return Some(sym);
                }
            }
        }
    }
    None
}
