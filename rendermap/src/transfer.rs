//! Codec-aware copies between physical instances.
//!
//! Opaque fields are never copied bitwise. A copy serializes each source
//! element into an intermediate buffer with the field's codec, then
//! deserializes a fresh value from the buffer into the destination slot,
//! destroying whatever the slot held before.
//!
//! The intermediate buffer holds `elements × max_serialized_size` bytes plus
//! one extra `max_serialized_size` of slack. Large domains are moved in
//! batches so that the buffer stays bounded.

use crate::region::{FieldId, PhysicalInstance, Point1, Rect1};
use crate::runtime::RuntimeError;
use crate::serdez::CodecError;
use bytes::BytesMut;

/// Upper bound on the intermediate buffer of one batch.
pub const MAX_INTERMEDIATE_BUFFER_BYTES: usize = 64 * 1024 * 1024;

/// Result of one field copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Elements serialized and deserialized.
    pub elements: usize,
    /// Payload bytes moved through the intermediate buffer.
    pub bytes: usize,
    /// Source slots that held no value and were left untouched.
    pub skipped: usize,
}

/// Size of the intermediate buffer for `elements` values of a codec.
pub fn intermediate_buffer_size(elements: usize, max_serialized_size: usize) -> usize {
    elements
        .saturating_mul(max_serialized_size)
        .saturating_add(max_serialized_size)
}

/// Elements moved per batch for a codec.
pub fn batch_elements(volume: usize, max_serialized_size: usize) -> usize {
    let fit = MAX_INTERMEDIATE_BUFFER_BYTES / max_serialized_size.max(1);
    fit.clamp(1, volume.max(1))
}

/// Copies `fid` over `domain` from `src` into `dst`.
///
/// Both instances must store the field with the same codec id.
pub fn copy_field(
    src: &PhysicalInstance,
    dst: &mut PhysicalInstance,
    fid: FieldId,
    domain: Rect1,
) -> Result<CopyStats, RuntimeError> {
    let src_store = src
        .field(fid)
        .ok_or_else(|| RuntimeError::invariant(format!("source instance lacks {}", fid)))?;
    let dst_memory = dst.memory();
    let dst_domain = dst.domain();
    let dst_store = dst
        .field_mut(fid)
        .ok_or_else(|| RuntimeError::invariant(format!("destination instance lacks {}", fid)))?;
    if src_store.serdez_id() != dst_store.serdez_id() {
        return Err(RuntimeError::invariant(format!(
            "serdez mismatch copying {}: source uses {}, destination uses {}",
            fid,
            src_store.serdez_id(),
            dst_store.serdez_id()
        )));
    }

    let codec = src_store.codec().clone();
    let max = codec.max_serialized_size();
    let points: Vec<Point1> = domain.points().collect();
    let batch = batch_elements(points.len(), max);
    let mut buffer = BytesMut::zeroed(intermediate_buffer_size(batch, max));
    let mut stats = CopyStats::default();

    for chunk in points.chunks(batch) {
        let mut staged = Vec::with_capacity(chunk.len());
        let mut cursor = 0;

        for &point in chunk {
            let offset = src
                .offset_of(point)
                .ok_or_else(|| RuntimeError::invariant(format!("{} outside source instance", point)))?;
            let Some(value) = src_store.get(offset) else {
                stats.skipped += 1;
                continue;
            };
            let written = codec.serialize(value, &mut buffer[cursor..])?;
            staged.push((point, cursor, written));
            cursor += written;
        }

        for (point, start, len) in staged {
            let (value, read) = codec.deserialize(&buffer[start..start + len])?;
            if read != len {
                return Err(CodecError::SizeMismatch {
                    codec: codec.name().to_string(),
                    expected: len,
                    actual: read,
                }
                .into());
            }
            let offset = dst_domain.offset_of(point).ok_or_else(|| {
                RuntimeError::invariant(format!("{} outside instance in {}", point, dst_memory))
            })?;
            dst_store.replace(offset, value)?;
            stats.elements += 1;
            stats.bytes += len;
        }
    }

    Ok(stats)
}
