//! `.gnu_debugdata` (MiniDebugInfo) support.
//!
//! The section carries an XZ-compressed ELF stripped down to its
//! `.symtab`/`.strtab`. The decompressed image is parsed in file form,
//! its symbol table is flattened into a name-to-value map, and the
//! buffer is dropped; only the map survives on the outer view.

use crate::info::ElfInfo;
use alloc::string::String;
use hashbrown::HashMap;

/// Leading bytes of an XZ stream.
const XZ_MAGIC: [u8; 5] = [0xFD, b'7', b'z', b'X', b'Z'];

/// Decodes `input` and flattens the embedded symbol table into
/// `symbols`. Inputs without the XZ magic are skipped silently; decoder
/// failures are logged and swallowed.
pub(crate) fn parse_mini_debug_info(input: &[u8], symbols: &mut HashMap<String, u64>) {
    if input.len() < 6 || input[..5] != XZ_MAGIC {
        return;
    }
    match decode_xz_data(input) {
        Ok(decompressed) => parse_debug_symbols(&decompressed, symbols),
        Err(err) => log::warn!("failed to decompress mini debug info: {err}"),
    }
}

fn parse_debug_symbols(input: &[u8], symbols: &mut HashMap<String, u64>) {
    let Ok(embedded) = ElfInfo::parse(input, false) else {
        return;
    };
    let (Some(symtab), Some(strtab)) = (embedded.symtab.as_ref(), embedded.strtab.as_ref()) else {
        return;
    };
    log::debug!(
        "mini debug info: {} bytes, {} symtab entries",
        input.len(),
        symtab.count()
    );
    for i in 0..symtab.count() {
        let Some(sym) = symtab.symbol(i) else {
            break;
        };
        let Some(name) = strtab.get_str(sym.st_name as usize) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        // the value is stored raw, the embedded image's own load bias is
        // not applied; first insertion wins
        symbols
            .entry(String::from(name))
            .or_insert(sym.st_value);
    }
}

#[cfg(feature = "xz")]
pub(crate) fn decode_xz_data(input: &[u8]) -> crate::Result<alloc::vec::Vec<u8>> {
    let mut reader = input;
    let mut output = alloc::vec::Vec::new();
    lzma_rs::xz_decompress(&mut reader, &mut output)
        .map_err(|err| crate::error::decompress_error(alloc::format!("{err:?}")))?;
    // a stream that decodes to nothing counts as a failed decode
    if output.is_empty() {
        return Err(crate::error::decompress_error("decoder produced no output"));
    }
    Ok(output)
}

#[cfg(not(feature = "xz"))]
pub(crate) fn decode_xz_data(_input: &[u8]) -> crate::Result<alloc::vec::Vec<u8>> {
    Err(crate::error::decompress_error("built without the xz feature"))
}
