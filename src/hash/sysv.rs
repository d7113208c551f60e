//! Traditional SysV hash table probe.

use crate::{
    defs::{read_u32, ElfSym},
    symbol::{ElfStringTable, SymbolTable},
};

/// SysV hash of a symbol name, in 32-bit unsigned arithmetic.
pub(crate) fn sysv_hash(name: &[u8]) -> u32 {
    let mut hash = 0u32;
    for byte in name {
        hash = (hash << 4).wrapping_add(u32::from(*byte));
        let g = hash & 0xf0000000;
        hash ^= g;
        hash ^= g >> 24;
    }
    hash
}

/// A SysV hash table with its bucket and chain spans located at attach
/// time. The spans stay as raw bytes of the attached range; every array
/// access is bounds-checked at read time.
pub(crate) struct ElfHash<'data> {
    nbucket: u32,
    nchain: u32,
    buckets: &'data [u8],
    chains: &'data [u8],
}

impl<'data> ElfHash<'data> {
    /// Locates the header and arrays inside the raw section bytes; the
    /// first two 32-bit words give the array lengths, the bucket array
    /// follows, and the chain array follows that.
    pub(crate) fn parse(raw: &'data [u8]) -> Option<ElfHash<'data>> {
        let nbucket = read_u32(raw, 0)?;
        let nchain = read_u32(raw, 4)?;
        let buckets = raw.get(8..)?;
        let chains = raw.get(8usize.checked_add((nbucket as usize).checked_mul(4)?)?..)?;
        Some(ElfHash {
            nbucket,
            nchain,
            buckets,
            chains,
        })
    }

    #[inline]
    fn bucket(&self, index: u32) -> Option<u32> {
        read_u32(self.buckets, index as usize * 4)
    }

    #[inline]
    fn chain(&self, index: usize) -> Option<u32> {
        read_u32(self.chains, index.checked_mul(4)?)
    }

    /// Probes the bucket for `name` and follows the chain until a match
    /// or index zero. The walk is capped at `nchain` steps so a corrupt
    /// cyclic chain terminates.
    pub(crate) fn lookup(
        &self,
        dynsym: &SymbolTable<'data>,
        dynstr: &ElfStringTable<'data>,
        name: &[u8],
    ) -> Option<(u32, ElfSym)> {
        if self.nbucket == 0 {
            return None;
        }
        let hash = sysv_hash(name);
        let mut index = self.bucket(hash % self.nbucket)?;
        let matches = |index: u32| -> Option<ElfSym> {
            let sym = dynsym.symbol(index as usize)?;
            (dynstr.get_bytes(sym.st_name as usize) == Some(name)).then_some(sym)
        };
        if let Some(sym) = matches(index) {
            return Some((index, sym));
        }
        for _ in 0..self.nchain {
            index = self.chain(index as usize)?;
            if let Some(sym) = matches(index) {
                return Some((index, sym));
            }
            if index == 0 {
                break;
            }
        }
        None
    }
}
