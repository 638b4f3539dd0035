use sha2::{Digest, Sha256};
use tilestream_terrain::TilePayload;

/// SHA-256 over a payload's coordinate, heights and splat weights, as lowercase hex.
///
/// Two runs with the same seed and config produce the same digest for the
/// same tile, which makes this a cheap determinism check.
pub fn tile_digest(payload: &TilePayload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.coord.x.to_le_bytes());
    hasher.update(payload.coord.z.to_le_bytes());

    hasher.update((payload.heights.resolution() as u64).to_le_bytes());
    for h in payload.heights.as_slice() {
        hasher.update(h.to_le_bytes());
    }

    hasher.update((payload.splat.resolution() as u64).to_le_bytes());
    for texel in payload.splat.texels() {
        for w in texel {
            hasher.update(w.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}
