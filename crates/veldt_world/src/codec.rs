//! # Chunk Record Codec
//!
//! Binary format used by the file repository.
//!
//! ## Chunk Record
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬───────────────────────────────┐
//! │ "VCHK"   │ ver u16 │ crc u32  │ LZ4 body (size-prepended)     │
//! └──────────┴─────────┴──────────┴───────────────────────────────┘
//!
//! body:
//!   world u64 │ x i32 │ y i32 │ seed i64 │ generated_at u64 │ nodes u16
//!   cells  [4 bytes x 1024]
//!   nodes  [id u64 │ type u32 │ cell u16 │ scale u8 │ pad u8] x nodes
//! ```
//!
//! All integers are little-endian. The CRC covers the compressed body.
//! Node lifecycle state is not part of the chunk record.
//!
//! ## Node State Record
//!
//! `tag u8 │ respawn_ready_at u64`, tag 0 = available, 1 = depleted.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use veldt_procedural::{ChunkCoord, TerrainCell};
use veldt_shared::{NodeId, TerrainType, Timestamp, WorldId, CELLS_PER_CHUNK};

use crate::error::{StorageError, StorageResult};
use crate::model::{Chunk, NodeState, ResourceNode};

/// Chunk record magic.
pub const CHUNK_MAGIC: &[u8; 4] = b"VCHK";
/// Chunk record format version.
pub const CHUNK_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 4;
const BODY_FIXED_LEN: usize = 8 + 4 + 4 + 8 + 8 + 2;
const CELL_BYTES: usize = CELLS_PER_CHUNK * std::mem::size_of::<TerrainCell>();
const NODE_LEN: usize = 8 + 4 + 2 + 1 + 1;
const NODE_STATE_LEN: usize = 1 + 8;

/// Encodes a chunk record.
#[must_use]
pub fn encode_chunk(chunk: &Chunk) -> Vec<u8> {
    let mut body = Vec::with_capacity(BODY_FIXED_LEN + CELL_BYTES + chunk.resource_nodes.len() * NODE_LEN);
    body.extend_from_slice(&chunk.world_id.get().to_le_bytes());
    body.extend_from_slice(&chunk.chunk_x.to_le_bytes());
    body.extend_from_slice(&chunk.chunk_y.to_le_bytes());
    body.extend_from_slice(&chunk.seed.to_le_bytes());
    body.extend_from_slice(&chunk.generated_at.as_millis().to_le_bytes());
    body.extend_from_slice(&(chunk.resource_nodes.len() as u16).to_le_bytes());
    body.extend_from_slice(bytemuck::cast_slice::<TerrainCell, u8>(&chunk.cells));
    for node in &chunk.resource_nodes {
        body.extend_from_slice(&(node.id.as_i64() as u64).to_le_bytes());
        body.extend_from_slice(&node.type_id.to_le_bytes());
        body.extend_from_slice(&node.cell_index.to_le_bytes());
        body.push(node.scale_pct);
        body.push(0);
    }

    let compressed = compress_prepend_size(&body);
    let crc = crc32fast::hash(&compressed);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(CHUNK_MAGIC);
    out.extend_from_slice(&CHUNK_VERSION.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&compressed);
    out
}

/// Decodes a chunk record.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if the record is truncated, fails its
/// checksum, or holds out-of-range values.
pub fn decode_chunk(bytes: &[u8]) -> StorageResult<Chunk> {
    let corrupt = |reason: &str| StorageError::corrupt("chunk record", reason);

    if bytes.len() < HEADER_LEN || &bytes[0..4] != CHUNK_MAGIC {
        return Err(corrupt("bad magic"));
    }
    let mut header = Reader::new(&bytes[4..HEADER_LEN]);
    let version = header.u16()?;
    if version != CHUNK_VERSION {
        return Err(corrupt(&format!("unsupported version {version}")));
    }
    let crc = header.u32()?;
    let compressed = &bytes[HEADER_LEN..];
    if crc32fast::hash(compressed) != crc {
        return Err(corrupt("checksum mismatch"));
    }

    let body = decompress_size_prepended(compressed).map_err(|e| corrupt(&e.to_string()))?;
    let mut r = Reader::new(&body);

    let world_id = WorldId::new(r.u64()?).ok_or_else(|| corrupt("world id 0"))?;
    let chunk_x = r.i32()?;
    let chunk_y = r.i32()?;
    let seed = r.i64()?;
    let generated_at = Timestamp(r.u64()?);
    let node_count = usize::from(r.u16()?);

    let cell_bytes = r.take(CELL_BYTES)?;
    let cells: Vec<TerrainCell> = bytemuck::try_cast_slice::<u8, TerrainCell>(cell_bytes)
        .map_err(|e| corrupt(&e.to_string()))?
        .to_vec();
    if cells.iter().any(|c| TerrainType::from_u8(c.terrain).is_none()) {
        return Err(corrupt("unknown terrain tag"));
    }

    let coord = ChunkCoord::new(chunk_x, chunk_y);
    let mut resource_nodes = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let raw_id = r.u64()?;
        let type_id = r.u32()?;
        let cell_index = r.u16()?;
        let scale_pct = r.u8()?;
        let _pad = r.u8()?;

        let id = i64::try_from(raw_id)
            .ok()
            .and_then(|raw| NodeId::from_raw(raw).ok())
            .ok_or_else(|| corrupt("node id out of range"))?;
        if usize::from(cell_index) >= CELLS_PER_CHUNK {
            return Err(corrupt("node cell out of range"));
        }
        let (tile_x, tile_y) = coord.tile_of(cell_index);
        resource_nodes.push(ResourceNode {
            id,
            type_id,
            cell_index,
            tile_x,
            tile_y,
            scale_pct,
            state: NodeState::Available,
        });
    }
    if !r.is_empty() {
        return Err(corrupt("trailing bytes"));
    }

    Ok(Chunk {
        world_id,
        chunk_x,
        chunk_y,
        seed,
        generated_at,
        cells,
        resource_nodes,
    })
}

/// Encodes a node state record.
#[must_use]
pub fn encode_node_state(state: NodeState) -> [u8; NODE_STATE_LEN] {
    let mut out = [0u8; NODE_STATE_LEN];
    if let NodeState::Depleted { respawn_ready_at } = state {
        out[0] = 1;
        out[1..].copy_from_slice(&respawn_ready_at.as_millis().to_le_bytes());
    }
    out
}

/// Decodes a node state record.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` for records of the wrong size or with an
/// unknown tag.
pub fn decode_node_state(bytes: &[u8]) -> StorageResult<NodeState> {
    let corrupt = |reason: &str| StorageError::corrupt("node state record", reason);
    if bytes.len() != NODE_STATE_LEN {
        return Err(corrupt("wrong length"));
    }
    let mut r = Reader::new(&bytes[1..]);
    let at = Timestamp(r.u64()?);
    match bytes[0] {
        0 => Ok(NodeState::Available),
        1 => Ok(NodeState::Depleted { respawn_ready_at: at }),
        tag => Err(corrupt(&format!("unknown tag {tag}"))),
    }
}

/// Bounds-checked little-endian reader.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> StorageResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(StorageError::corrupt("record", "truncated"));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> StorageResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> StorageResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> StorageResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> StorageResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> StorageResult<i32> {
        self.array().map(i32::from_le_bytes)
    }

    fn u64(&mut self) -> StorageResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> StorageResult<i64> {
        self.array().map(i64::from_le_bytes)
    }

    const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veldt_procedural::{ChunkGenerator, WorldSeed};

    fn sample_chunk() -> Chunk {
        let generated = ChunkGenerator::with_defaults(WorldSeed::new(12345)).generate(ChunkCoord::new(10, 20));
        Chunk::from_generated(WorldId::new(3).unwrap(), generated, Timestamp(1_700_000_000_000))
    }

    #[test]
    fn test_chunk_record_roundtrip() {
        let chunk = sample_chunk();
        let bytes = encode_chunk(&chunk);
        assert_eq!(&bytes[0..4], CHUNK_MAGIC);
        assert_eq!(decode_chunk(&bytes).unwrap(), chunk);
    }

    #[test]
    fn test_flipped_bit_is_detected() {
        let mut bytes = encode_chunk(&sample_chunk());
        let last = bytes.len() - 1;
        bytes[last] ^= 0x40;
        assert!(matches!(decode_chunk(&bytes), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_truncated_record_is_rejected() {
        let bytes = encode_chunk(&sample_chunk());
        assert!(decode_chunk(&bytes[..HEADER_LEN - 1]).is_err());
        assert!(decode_chunk(b"NOPE0000000000").is_err());
    }

    #[test]
    fn test_node_state_records() {
        let depleted = NodeState::Depleted {
            respawn_ready_at: Timestamp(77),
        };
        assert_eq!(decode_node_state(&encode_node_state(depleted)).unwrap(), depleted);
        assert_eq!(
            decode_node_state(&encode_node_state(NodeState::Available)).unwrap(),
            NodeState::Available
        );
        assert!(decode_node_state(&[9, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(decode_node_state(&[0]).is_err());
    }
}
