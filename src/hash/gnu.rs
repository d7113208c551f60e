//! GNU hash table probe.
//!
//! Layout reference: <https://flapenguin.me/elf-dt-gnu-hash>

use crate::{
    defs::{read_u32, read_u64, ElfClass, ElfSym},
    symbol::{ElfStringTable, SymbolTable},
};

/// GNU (djb2) hash of a symbol name, in 32-bit unsigned arithmetic.
pub(crate) fn gnu_hash(name: &[u8]) -> u32 {
    let mut hash = 5381u32;
    for byte in name {
        hash = hash.wrapping_mul(33).wrapping_add(u32::from(*byte));
    }
    hash
}

/// A GNU hash table re-derived from the raw section bytes. The bloom
/// words take the class word size; buckets and chain entries are 32-bit
/// in both classes.
pub(crate) struct ElfGnuHash<'data> {
    nbuckets: u32,
    symoffset: u32,
    bloom_size: u32,
    bloom_shift: u32,
    blooms: &'data [u8],
    buckets: &'data [u8],
    chains: &'data [u8],
    class: ElfClass,
}

impl<'data> ElfGnuHash<'data> {
    pub(crate) fn parse(raw: &'data [u8], class: ElfClass) -> Option<ElfGnuHash<'data>> {
        let nbuckets = read_u32(raw, 0)?;
        let symoffset = read_u32(raw, 4)?;
        let bloom_size = read_u32(raw, 8)?;
        let bloom_shift = read_u32(raw, 12)?;
        if nbuckets == 0 || bloom_size == 0 {
            return None;
        }
        let bloom_bytes = (bloom_size as usize).checked_mul(class.pointer_size())?;
        let bucket_bytes = (nbuckets as usize).checked_mul(4)?;
        let blooms = raw.get(16..)?;
        let buckets = raw.get(16usize.checked_add(bloom_bytes)?..)?;
        let chains = raw.get(16usize.checked_add(bloom_bytes)?.checked_add(bucket_bytes)?..)?;
        Some(ElfGnuHash {
            nbuckets,
            symoffset,
            bloom_size,
            bloom_shift,
            blooms,
            buckets,
            chains,
            class,
        })
    }

    /// Bloom word at `index`, widened to 64 bits.
    #[inline]
    fn bloom_word(&self, index: u32) -> Option<u64> {
        let offset = (index as usize).checked_mul(self.class.pointer_size())?;
        if self.class.is_64() {
            read_u64(self.blooms, offset)
        } else {
            read_u32(self.blooms, offset).map(u64::from)
        }
    }

    #[inline]
    fn bucket(&self, index: u32) -> Option<u32> {
        read_u32(self.buckets, index as usize * 4)
    }

    #[inline]
    fn chain(&self, index: u32) -> Option<u32> {
        read_u32(self.chains, index as usize * 4)
    }

    /// Bloom filter, bucket, then chain walk. The chain covers the
    /// symbols from `symoffset` up and terminates at an entry with the
    /// low bit set; the low bit is masked out of the stored hashes for
    /// comparison.
    pub(crate) fn lookup(
        &self,
        dynsym: &SymbolTable<'data>,
        dynstr: &ElfStringTable<'data>,
        name: &[u8],
    ) -> Option<(u32, ElfSym)> {
        let bits = if self.class.is_64() { 64u32 } else { 32u32 };
        let hash = gnu_hash(name);
        let word = self.bloom_word((hash / bits) % self.bloom_size)?;
        // an oversized shift amount is corrupt input, treat it as zero
        let shifted = hash.checked_shr(self.bloom_shift).unwrap_or(0);
        let mask = (1u64 << (hash % bits)) | (1u64 << (shifted % bits));
        // a clear bit proves the symbol absent
        if word & mask != mask {
            return None;
        }
        let mut symix = self.bucket(hash % self.nbuckets)?;
        if symix < self.symoffset {
            return None;
        }
        loop {
            let chain_hash = self.chain(symix - self.symoffset)?;
            if (hash | 1) == (chain_hash | 1) {
                let sym = dynsym.symbol(symix as usize)?;
                if dynstr.get_bytes(sym.st_name as usize) == Some(name) {
                    return Some((symix, sym));
                }
            }
            if chain_hash & 1 != 0 {
                break;
            }
            symix += 1;
        }
        None
    }
}
