//! Bag-of-cells wire encoding

use super::{ArcCell, BagOfCells, Cell, CellError, CellResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// Smallest possible serialized cell: two descriptor bytes, no data
const MIN_CELL_BYTES: u64 = 2;

/// Representation hash of `cell`, hex encoded
pub fn cell_hash_hex(cell: &Cell) -> String {
    hex::encode(cell.cell_hash())
}

/// Serialize a single-root bag of cells with a CRC32-C trailer
pub fn encode_boc(root: &ArcCell) -> CellResult<Vec<u8>> {
    BagOfCells::from_root(root.as_ref().clone())
        .serialize(true)
        .map_err(|e| CellError::Encoding(e.to_string()))
}

pub fn encode_boc_base64(root: &ArcCell) -> CellResult<String> {
    encode_boc(root).map(|bytes| STANDARD.encode(bytes))
}

/// Parse a bag of cells and return its only root
pub fn decode_boc(bytes: &[u8]) -> CellResult<ArcCell> {
    check_header(bytes)?;
    let boc = BagOfCells::parse(bytes).map_err(|e| CellError::InvalidBoc(e.to_string()))?;
    let root = boc
        .single_root()
        .map_err(|e| CellError::InvalidBoc(e.to_string()))?;
    Ok(root.clone())
}

pub fn decode_boc_base64(input: &str) -> CellResult<ArcCell> {
    let bytes = STANDARD
        .decode(input.trim())
        .map_err(|e| CellError::InvalidBoc(format!("bad base64: {}", e)))?;
    decode_boc(&bytes)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

/// Reject headers whose counts cannot fit in the remaining input
///
/// The parser sizes its tables from these counts, so they are bounded by
/// the bytes actually present before any parsing happens.
fn check_header(bytes: &[u8]) -> CellResult<()> {
    let invalid = |reason: String| Err(CellError::InvalidBoc(reason));

    if bytes.len() < 6 || bytes[..4] != BOC_MAGIC {
        return invalid("missing bag-of-cells magic".to_string());
    }
    let flags = bytes[4];
    let has_idx = flags & 0x80 != 0;
    let has_crc = flags & 0x40 != 0;
    let size = (flags & 0x07) as usize;
    let off_bytes = bytes[5] as usize;
    if !(1..=4).contains(&size) || !(1..=8).contains(&off_bytes) {
        return invalid(format!("bad field widths: size {}, offset {}", size, off_bytes));
    }

    let header_len = 6 + size * 3 + off_bytes;
    if bytes.len() < header_len {
        return invalid("truncated header".to_string());
    }
    let mut at = 6;
    let mut field = |width: usize| {
        let v = read_be(&bytes[at..at + width]);
        at += width;
        v
    };
    let cells = field(size);
    let roots = field(size);
    let absent = field(size);
    let total_size = field(off_bytes);

    let mut remaining = (bytes.len() - header_len) as u64;
    if has_crc {
        remaining = remaining.saturating_sub(4);
    }
    let root_list = roots.saturating_mul(size as u64);
    let index = if has_idx {
        cells.saturating_mul(off_bytes as u64)
    } else {
        0
    };

    if cells == 0 || roots == 0 || roots > cells || absent > cells {
        return invalid(format!("inconsistent counts: {} cells, {} roots", cells, roots));
    }
    if cells.saturating_mul(MIN_CELL_BYTES) > remaining {
        return invalid(format!("{} cells declared, {} bytes available", cells, remaining));
    }
    if root_list
        .saturating_add(index)
        .saturating_add(total_size)
        > remaining
    {
        return invalid(format!("declared sizes exceed {} available bytes", remaining));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{coins, CellBuilder};
    use std::sync::Arc;

    fn sample_tree() -> ArcCell {
        let mut leaf = CellBuilder::new();
        leaf.store_u32(32, 0xdead_beef).unwrap();
        let leaf = Arc::new(leaf.build().unwrap());

        let mut root = CellBuilder::new();
        root.store_bit(true)
            .unwrap()
            .store_coins(&coins(1_000))
            .unwrap()
            .store_reference(&leaf)
            .unwrap();
        Arc::new(root.build().unwrap())
    }

    #[test]
    fn test_roundtrip_keeps_hash() {
        let root = sample_tree();
        let encoded = encode_boc_base64(&root).unwrap();
        let decoded = decode_boc_base64(&encoded).unwrap();
        assert_eq!(cell_hash_hex(&decoded), cell_hash_hex(&root));
        assert_eq!(decoded.references().len(), 1);
    }

    #[test]
    fn test_huge_cell_count_is_rejected() {
        // 23 bytes: magic, size 4, offset 1, cells 0xffffffff, one root
        let mut bytes = BOC_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x04, 0x01]);
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        bytes.extend_from_slice(&[0, 0, 0, 1]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.push(2);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(bytes.len(), 23);

        let err = decode_boc(&bytes).unwrap_err();
        assert!(matches!(err, CellError::InvalidBoc(ref r) if r.contains("cells declared")));
    }

    #[test]
    fn test_root_count_above_cell_count_is_rejected() {
        let mut bytes = BOC_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x01, 0x01, 1, 0xff, 0, 2]);
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(decode_boc(&bytes), Err(CellError::InvalidBoc(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode_boc(&[]).is_err());
        assert!(decode_boc(b"not a boc at all").is_err());
        assert!(decode_boc_base64("!!!").is_err());

        let mut bytes = encode_boc(&sample_tree()).unwrap();
        bytes.truncate(bytes.len() - 6);
        assert!(decode_boc(&bytes).is_err());
    }
}
