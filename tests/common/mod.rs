#![allow(dead_code)]

//! Synthetic shared objects for the integration tests.
//!
//! The builder lays every table out so that its file offset equals its
//! virtual address: one PT_LOAD maps the byte range from `load_bias` to
//! the end of the image at that same address, the way a prelinked shared
//! object is laid out. That keeps the dynamic-tag pointers, the section
//! addresses and the file offsets mutually consistent, so the images
//! work for both the file-form and the loaded-form attach.

use byteorder::{NativeEndian, WriteBytesExt};
use elf::abi::{
    DT_JMPREL, DT_NULL, DT_PLTREL, DT_PLTRELSZ, DT_REL, DT_RELA, DT_RELASZ, DT_RELSZ, DT_SONAME,
    DT_STRTAB, ET_DYN, PT_DYNAMIC, PT_LOAD, SHT_DYNSYM, SHT_GNU_HASH, SHT_HASH, SHT_PROGBITS,
    SHT_STRTAB, SHT_SYMTAB,
};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

impl Class {
    fn is_64(self) -> bool {
        self == Class::Elf64
    }

    fn ehdr_size(self) -> usize {
        if self.is_64() { 64 } else { 52 }
    }

    fn phentsize(self) -> usize {
        if self.is_64() { 56 } else { 32 }
    }

    fn shentsize(self) -> usize {
        if self.is_64() { 64 } else { 40 }
    }

    fn sym_size(self) -> usize {
        if self.is_64() { 24 } else { 16 }
    }

    fn dyn_size(self) -> usize {
        if self.is_64() { 16 } else { 8 }
    }

    fn rel_size(self, rela: bool) -> usize {
        match (self, rela) {
            (Class::Elf32, false) => 8,
            (Class::Elf32, true) => 12,
            (Class::Elf64, false) => 16,
            (Class::Elf64, true) => 24,
        }
    }
}

/// Description of one synthetic shared object.
pub struct SoSpec {
    pub class: Class,
    pub machine: u16,
    /// `p_vaddr` (and file offset) of the single PT_LOAD segment.
    pub load_bias: u64,
    pub soname: Option<&'static str>,
    /// Defined dynamic symbols, `(name, st_value)`.
    pub exports: Vec<(&'static str, u64)>,
    /// Undefined dynamic symbols.
    pub imports: Vec<&'static str>,
    /// `.symtab`/`.strtab` entries, `(name, st_value)`.
    pub locals: Vec<(&'static str, u64)>,
    pub gnu_hash: bool,
    pub sysv_hash: bool,
    /// Record shape of the relocation tables, announced via `DT_PLTREL`.
    pub use_rela: bool,
    /// `.rel(a).plt` records, `(dynsym name, r_type, r_offset)`.
    pub plt_relocs: Vec<(&'static str, u32, u64)>,
    /// `.rel(a).dyn` records, `(dynsym name, r_type, r_offset)`.
    pub dyn_relocs: Vec<(&'static str, u32, u64)>,
    /// Raw `.gnu_debugdata` payload, normally XZ-compressed.
    pub gnu_debugdata: Vec<u8>,
    /// Emit program headers, the dynamic tables and the hash sections.
    /// Off for the stripped-to-symtab images embedded as debug data.
    pub with_dynamic: bool,
}

impl Default for SoSpec {
    fn default() -> Self {
        SoSpec {
            class: Class::Elf64,
            machine: elf::abi::EM_X86_64,
            load_bias: 0x1000,
            soname: None,
            exports: Vec::new(),
            imports: Vec::new(),
            locals: Vec::new(),
            gnu_hash: true,
            sysv_hash: true,
            use_rela: true,
            plt_relocs: Vec::new(),
            dyn_relocs: Vec::new(),
            gnu_debugdata: Vec::new(),
            with_dynamic: true,
        }
    }
}

pub fn sysv_hash(name: &str) -> u32 {
    let mut hash = 0u32;
    for byte in name.bytes() {
        hash = (hash << 4).wrapping_add(u32::from(byte));
        let g = hash & 0xf000_0000;
        hash ^= g;
        hash ^= g >> 24;
    }
    hash
}

pub fn gnu_hash(name: &str) -> u32 {
    let mut hash = 5381u32;
    for byte in name.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u32::from(byte));
    }
    hash
}

// native endian throughout, matching the parser's reads
fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.write_u16::<NativeEndian>(value).unwrap();
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.write_u32::<NativeEndian>(value).unwrap();
}

fn push_u64(buf: &mut Vec<u8>, value: u64) {
    buf.write_u64::<NativeEndian>(value).unwrap();
}

fn push_word(buf: &mut Vec<u8>, class: Class, value: u64) {
    if class.is_64() {
        push_u64(buf, value);
    } else {
        push_u32(buf, value as u32);
    }
}

fn align_to(buf: &mut Vec<u8>, align: usize) {
    while buf.len() % align != 0 {
        buf.push(0);
    }
}

/// A string table under construction; offset 0 is the empty string.
struct StrTab {
    bytes: Vec<u8>,
}

impl StrTab {
    fn new() -> Self {
        StrTab { bytes: vec![0] }
    }

    fn insert(&mut self, name: &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(0);
        offset
    }
}

fn push_sym(buf: &mut Vec<u8>, class: Class, st_name: u32, st_value: u64, defined: bool) {
    // STB_GLOBAL | STT_FUNC
    let st_info = 0x12u8;
    let st_shndx: u16 = if defined { 1 } else { 0 };
    if class.is_64() {
        push_u32(buf, st_name);
        buf.push(st_info);
        buf.push(0);
        push_u16(buf, st_shndx);
        push_u64(buf, st_value);
        push_u64(buf, 0);
    } else {
        push_u32(buf, st_name);
        push_u32(buf, st_value as u32);
        push_u32(buf, 0);
        buf.push(st_info);
        buf.push(0);
        push_u16(buf, st_shndx);
    }
}

fn push_rel(buf: &mut Vec<u8>, class: Class, rela: bool, r_offset: u64, sym: u32, r_type: u32) {
    if class.is_64() {
        push_u64(buf, r_offset);
        push_u64(buf, (u64::from(sym) << 32) | u64::from(r_type));
        if rela {
            push_u64(buf, 0);
        }
    } else {
        push_u32(buf, r_offset as u32);
        push_u32(buf, (sym << 8) | (r_type & 0xff));
        if rela {
            push_u32(buf, 0);
        }
    }
}

fn push_dyn(buf: &mut Vec<u8>, class: Class, tag: i64, value: u64) {
    if class.is_64() {
        push_u64(buf, tag as u64);
        push_u64(buf, value);
    } else {
        push_u32(buf, tag as u32);
        push_u32(buf, value as u32);
    }
}

struct Section {
    name: &'static str,
    sh_type: u32,
    sh_addr: u64,
    sh_offset: u64,
    sh_size: u64,
}

pub fn build(spec: &SoSpec) -> Vec<u8> {
    let class = spec.class;
    let mut image = Vec::new();
    image.resize(class.ehdr_size(), 0);
    let phoff = image.len();
    let phnum = if spec.with_dynamic { 2 } else { 0 };
    image.resize(phoff + phnum * class.phentsize(), 0);
    if (spec.load_bias as usize) > image.len() {
        image.resize(spec.load_bias as usize, 0);
    }

    // dynamic symbol names: the null entry, the imports, the exports
    let mut dynsym_names: Vec<(&str, u64, bool)> = vec![("", 0, false)];
    for name in &spec.imports {
        dynsym_names.push((*name, 0, false));
    }
    for (name, value) in &spec.exports {
        dynsym_names.push((*name, *value, true));
    }
    let symoffset = 1 + spec.imports.len() as u32;
    let dynsym_index = |name: &str| -> u32 {
        dynsym_names
            .iter()
            .position(|(n, _, _)| *n == name)
            .expect("relocation against a symbol missing from dynsym") as u32
    };

    let mut sections = Vec::new();
    let mut dyn_entries: Vec<(i64, u64)> = Vec::new();

    if spec.with_dynamic {
        let mut dynstr = StrTab::new();
        let name_offsets: Vec<u32> = dynsym_names
            .iter()
            .map(|(name, _, _)| if name.is_empty() { 0 } else { dynstr.insert(name) })
            .collect();
        let soname_off = spec.soname.map(|soname| dynstr.insert(soname));

        let dynstr_off = image.len() as u64;
        image.extend_from_slice(&dynstr.bytes);
        sections.push(Section {
            name: ".dynstr",
            sh_type: SHT_STRTAB,
            sh_addr: dynstr_off,
            sh_offset: dynstr_off,
            sh_size: dynstr.bytes.len() as u64,
        });

        align_to(&mut image, 8);
        let dynsym_off = image.len() as u64;
        for (i, (_, value, defined)) in dynsym_names.iter().enumerate() {
            push_sym(&mut image, class, name_offsets[i], *value, *defined);
        }
        sections.push(Section {
            name: ".dynsym",
            sh_type: SHT_DYNSYM,
            sh_addr: dynsym_off,
            sh_offset: dynsym_off,
            sh_size: (dynsym_names.len() * class.sym_size()) as u64,
        });

        if spec.sysv_hash {
            align_to(&mut image, 8);
            let hash_off = image.len() as u64;
            let nchain = dynsym_names.len() as u32;
            let mut bucket = 0u32;
            let mut chain = vec![0u32; nchain as usize];
            // a single bucket, so every hash lands in it and the chain
            // threads all symbols in reverse insertion order
            for i in 1..nchain as usize {
                chain[i] = bucket;
                bucket = i as u32;
            }
            push_u32(&mut image, 1);
            push_u32(&mut image, nchain);
            push_u32(&mut image, bucket);
            for value in chain {
                push_u32(&mut image, value);
            }
            sections.push(Section {
                name: ".hash",
                sh_type: SHT_HASH,
                sh_addr: hash_off,
                sh_offset: hash_off,
                sh_size: (2 + 1 + nchain as usize) as u64 * 4,
            });
        }

        if spec.gnu_hash {
            align_to(&mut image, 8);
            let gnu_off = image.len() as u64;
            let bloom_shift = 6u32;
            let mut bloom = 0u64;
            let bits = if class.is_64() { 64u32 } else { 32u32 };
            for (name, _) in &spec.exports {
                let h = gnu_hash(name);
                bloom |= 1u64 << (h % bits);
                bloom |= 1u64 << ((h >> bloom_shift) % bits);
            }
            push_u32(&mut image, 1); // nbuckets
            push_u32(&mut image, symoffset);
            push_u32(&mut image, 1); // bloom_size
            push_u32(&mut image, bloom_shift);
            push_word(&mut image, class, bloom);
            // the single bucket points at the first hashed symbol
            push_u32(&mut image, if spec.exports.is_empty() { 0 } else { symoffset });
            for (i, (name, _)) in spec.exports.iter().enumerate() {
                let h = gnu_hash(name);
                let last = i + 1 == spec.exports.len();
                push_u32(&mut image, if last { h | 1 } else { h & !1 });
            }
            let gnu_size = image.len() as u64 - gnu_off;
            sections.push(Section {
                name: ".gnu.hash",
                sh_type: SHT_GNU_HASH,
                sh_addr: gnu_off,
                sh_offset: gnu_off,
                sh_size: gnu_size,
            });
        }

        if !spec.plt_relocs.is_empty() {
            align_to(&mut image, 8);
            let relplt_off = image.len() as u64;
            for (name, r_type, r_offset) in &spec.plt_relocs {
                push_rel(&mut image, class, spec.use_rela, *r_offset, dynsym_index(name), *r_type);
            }
            dyn_entries.push((DT_JMPREL, relplt_off));
            dyn_entries.push((
                DT_PLTRELSZ,
                (spec.plt_relocs.len() * class.rel_size(spec.use_rela)) as u64,
            ));
        }

        if !spec.dyn_relocs.is_empty() {
            align_to(&mut image, 8);
            let reldyn_off = image.len() as u64;
            for (name, r_type, r_offset) in &spec.dyn_relocs {
                push_rel(&mut image, class, spec.use_rela, *r_offset, dynsym_index(name), *r_type);
            }
            let reldyn_bytes = (spec.dyn_relocs.len() * class.rel_size(spec.use_rela)) as u64;
            if spec.use_rela {
                dyn_entries.push((DT_RELA, reldyn_off));
                dyn_entries.push((DT_RELASZ, reldyn_bytes));
            } else {
                dyn_entries.push((DT_REL, reldyn_off));
                dyn_entries.push((DT_RELSZ, reldyn_bytes));
            }
        }

        dyn_entries.push((DT_STRTAB, dynstr_off));
        if let Some(off) = soname_off {
            dyn_entries.push((DT_SONAME, off as u64));
        }
        dyn_entries.push((DT_PLTREL, (if spec.use_rela { DT_RELA } else { DT_REL }) as u64));
        dyn_entries.push((DT_NULL, 0));
    }

    if !spec.locals.is_empty() {
        let mut strtab = StrTab::new();
        let name_offsets: Vec<u32> = spec.locals.iter().map(|(name, _)| strtab.insert(name)).collect();
        let strtab_off = image.len() as u64;
        image.extend_from_slice(&strtab.bytes);
        sections.push(Section {
            name: ".strtab",
            sh_type: SHT_STRTAB,
            sh_addr: 0,
            sh_offset: strtab_off,
            sh_size: strtab.bytes.len() as u64,
        });
        align_to(&mut image, 8);
        let symtab_off = image.len() as u64;
        for (i, (_, value)) in spec.locals.iter().enumerate() {
            push_sym(&mut image, class, name_offsets[i], *value, true);
        }
        sections.push(Section {
            name: ".symtab",
            sh_type: SHT_SYMTAB,
            sh_addr: 0,
            sh_offset: symtab_off,
            sh_size: (spec.locals.len() * class.sym_size()) as u64,
        });
    }

    if !spec.gnu_debugdata.is_empty() {
        let debug_off = image.len() as u64;
        image.extend_from_slice(&spec.gnu_debugdata);
        sections.push(Section {
            name: ".gnu_debugdata",
            sh_type: SHT_PROGBITS,
            sh_addr: 0,
            sh_offset: debug_off,
            sh_size: spec.gnu_debugdata.len() as u64,
        });
    }

    // the dynamic table itself
    let mut dyn_off = 0u64;
    let dyn_bytes = dyn_entries.len() * class.dyn_size();
    if spec.with_dynamic {
        align_to(&mut image, 8);
        dyn_off = image.len() as u64;
        for (tag, value) in &dyn_entries {
            push_dyn(&mut image, class, *tag, *value);
        }
    }

    // section header string table
    let mut shstrtab = StrTab::new();
    let mut name_offsets: Vec<u32> = sections.iter().map(|s| shstrtab.insert(s.name)).collect();
    name_offsets.push(shstrtab.insert(".shstrtab"));
    let shstr_off = image.len() as u64;
    image.extend_from_slice(&shstrtab.bytes);
    sections.push(Section {
        name: ".shstrtab",
        sh_type: SHT_STRTAB,
        sh_addr: 0,
        sh_offset: shstr_off,
        sh_size: shstrtab.bytes.len() as u64,
    });

    align_to(&mut image, 8);
    let shoff = image.len() as u64;
    let shnum = sections.len() + 1;
    let shstrndx = shnum - 1;
    // null section header
    image.resize(image.len() + class.shentsize(), 0);
    for (i, section) in sections.iter().enumerate() {
        push_shdr(&mut image, class, name_offsets[i], section);
    }

    let file_len = image.len() as u64;

    // program headers: one PT_LOAD mapping [load_bias, end) at itself,
    // one PT_DYNAMIC
    if spec.with_dynamic {
        let mut phdrs = Vec::new();
        push_phdr(
            &mut phdrs,
            class,
            PT_LOAD,
            spec.load_bias,
            spec.load_bias,
            file_len - spec.load_bias,
        );
        push_phdr(&mut phdrs, class, PT_DYNAMIC, dyn_off, dyn_off, dyn_bytes as u64);
        image[phoff..phoff + phdrs.len()].copy_from_slice(&phdrs);
    }

    // the ELF header
    let mut ehdr = Vec::new();
    ehdr.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
    ehdr.push(if class.is_64() { 2 } else { 1 });
    ehdr.push(1); // ELFDATA2LSB
    ehdr.push(1); // EV_CURRENT
    ehdr.resize(16, 0);
    push_u16(&mut ehdr, ET_DYN);
    push_u16(&mut ehdr, spec.machine);
    push_u32(&mut ehdr, 1);
    push_word(&mut ehdr, class, 0); // e_entry
    push_word(&mut ehdr, class, if spec.with_dynamic { phoff as u64 } else { 0 });
    push_word(&mut ehdr, class, shoff);
    push_u32(&mut ehdr, 0); // e_flags
    push_u16(&mut ehdr, class.ehdr_size() as u16);
    push_u16(&mut ehdr, class.phentsize() as u16);
    push_u16(&mut ehdr, phnum as u16);
    push_u16(&mut ehdr, class.shentsize() as u16);
    push_u16(&mut ehdr, shnum as u16);
    push_u16(&mut ehdr, shstrndx as u16);
    image[..ehdr.len()].copy_from_slice(&ehdr);

    image
}

fn push_phdr(buf: &mut Vec<u8>, class: Class, p_type: u32, offset: u64, vaddr: u64, size: u64) {
    if class.is_64() {
        push_u32(buf, p_type);
        push_u32(buf, 0x7); // p_flags
        push_u64(buf, offset);
        push_u64(buf, vaddr);
        push_u64(buf, vaddr); // p_paddr
        push_u64(buf, size);
        push_u64(buf, size);
        push_u64(buf, 0x1000);
    } else {
        push_u32(buf, p_type);
        push_u32(buf, offset as u32);
        push_u32(buf, vaddr as u32);
        push_u32(buf, vaddr as u32);
        push_u32(buf, size as u32);
        push_u32(buf, size as u32);
        push_u32(buf, 0x7);
        push_u32(buf, 0x1000);
    }
}

fn push_shdr(buf: &mut Vec<u8>, class: Class, name_off: u32, section: &Section) {
    if class.is_64() {
        push_u32(buf, name_off);
        push_u32(buf, section.sh_type);
        push_u64(buf, 0); // sh_flags
        push_u64(buf, section.sh_addr);
        push_u64(buf, section.sh_offset);
        push_u64(buf, section.sh_size);
        push_u32(buf, 0); // sh_link
        push_u32(buf, 0); // sh_info
        push_u64(buf, 8); // sh_addralign
        push_u64(buf, 0); // sh_entsize
    } else {
        push_u32(buf, name_off);
        push_u32(buf, section.sh_type);
        push_u32(buf, 0);
        push_u32(buf, section.sh_addr as u32);
        push_u32(buf, section.sh_offset as u32);
        push_u32(buf, section.sh_size as u32);
        push_u32(buf, 0);
        push_u32(buf, 0);
        push_u32(buf, 4);
        push_u32(buf, 0);
    }
}
