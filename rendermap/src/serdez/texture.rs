//! Texture payload and its codec.
//!
//! Every slot of the benchmark collection owns a square texture of RGB
//! texels. The wire format is the texels in row-major order, each channel a
//! little-endian `f64`, with no header: the side length is a property of the
//! codec, not of the payload.

use super::error::CodecError;
use super::traits::CustomSerdez;
use bytes::{Buf, BufMut};

/// Default texture side length in texels.
pub const DEFAULT_TEXTURE_SIDE: usize = 512;

const CHANNELS: usize = 3;
const CHANNEL_BYTES: usize = std::mem::size_of::<f64>();

/// One texel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
}

/// A `side × side` texture.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureObject {
    side: usize,
    texels: Vec<Rgb>,
}

impl TextureObject {
    /// Creates a texture with every channel set to 1.0.
    pub fn new(side: usize) -> Self {
        Self {
            side,
            texels: vec![Rgb::WHITE; side * side],
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn texels(&self) -> &[Rgb] {
        &self.texels
    }

    pub fn texel(&self, x: usize, y: usize) -> Option<&Rgb> {
        if x >= self.side || y >= self.side {
            return None;
        }
        self.texels.get(y * self.side + x)
    }

    pub fn texel_mut(&mut self, x: usize, y: usize) -> Option<&mut Rgb> {
        if x >= self.side || y >= self.side {
            return None;
        }
        self.texels.get_mut(y * self.side + x)
    }

    /// Sum of all channels, for comparing payloads after a codec round trip.
    pub fn checksum(&self) -> f64 {
        self.texels.iter().map(|t| t.r + t.g + t.b).sum()
    }
}

/// Codec for [`TextureObject`]s of a fixed side length.
#[derive(Clone, Copy, Debug)]
pub struct TextureSerdez {
    side: usize,
}

impl TextureSerdez {
    pub fn new(side: usize) -> Self {
        Self { side }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    fn payload_size(&self) -> usize {
        self.side * self.side * CHANNELS * CHANNEL_BYTES
    }
}

impl Default for TextureSerdez {
    fn default() -> Self {
        Self::new(DEFAULT_TEXTURE_SIDE)
    }
}

impl CustomSerdez for TextureSerdez {
    type Value = TextureObject;

    fn name(&self) -> &str {
        "texture"
    }

    fn max_serialized_size(&self) -> usize {
        self.payload_size()
    }

    fn serialized_size(&self, _value: &TextureObject) -> usize {
        self.payload_size()
    }

    fn serialize(&self, value: &TextureObject, buf: &mut [u8]) -> Result<usize, CodecError> {
        let size = self.payload_size();
        if value.side != self.side || value.texels.len() != self.side * self.side {
            return Err(CodecError::SizeMismatch {
                codec: self.name().to_string(),
                expected: size,
                actual: value.texels.len() * CHANNELS * CHANNEL_BYTES,
            });
        }
        if buf.len() < size {
            return Err(CodecError::BufferTooSmall {
                codec: self.name().to_string(),
                needed: size,
                available: buf.len(),
            });
        }

        let mut out = &mut buf[..size];
        for texel in &value.texels {
            out.put_f64_le(texel.r);
            out.put_f64_le(texel.g);
            out.put_f64_le(texel.b);
        }
        Ok(size)
    }

    fn deserialize(&self, buf: &[u8]) -> Result<(Box<TextureObject>, usize), CodecError> {
        let size = self.payload_size();
        if buf.len() < size {
            return Err(CodecError::BufferTooSmall {
                codec: self.name().to_string(),
                needed: size,
                available: buf.len(),
            });
        }

        let mut input = &buf[..size];
        let mut texels = Vec::with_capacity(self.side * self.side);
        for _ in 0..self.side * self.side {
            texels.push(Rgb {
                r: input.get_f64_le(),
                g: input.get_f64_le(),
                b: input.get_f64_le(),
            });
        }
        let value = Box::new(TextureObject {
            side: self.side,
            texels,
        });
        Ok((value, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_texture_is_white() {
        let texture = TextureObject::new(4);
        assert_eq!(texture.texels().len(), 16);
        assert!(texture.texels().iter().all(|t| *t == Rgb::WHITE));
        assert_eq!(texture.checksum(), 48.0);
    }

    #[test]
    fn test_default_side() {
        let codec = TextureSerdez::default();
        assert_eq!(codec.side(), DEFAULT_TEXTURE_SIDE);
        assert_eq!(codec.max_serialized_size(), 512 * 512 * 3 * 8);
    }

    #[test]
    fn test_round_trip_is_bit_identical() {
        let codec = TextureSerdez::new(3);
        let mut texture = TextureObject::new(3);
        *texture.texel_mut(1, 2).unwrap() = Rgb {
            r: -0.0,
            g: f64::MIN_POSITIVE,
            b: 1.0e300,
        };

        let mut buf = vec![0u8; codec.max_serialized_size()];
        let written = codec.serialize(&texture, &mut buf).unwrap();
        let (copy, read) = codec.deserialize(&buf).unwrap();

        assert_eq!(written, read);
        for (a, b) in texture.texels().iter().zip(copy.texels()) {
            assert_eq!(a.r.to_bits(), b.r.to_bits());
            assert_eq!(a.g.to_bits(), b.g.to_bits());
            assert_eq!(a.b.to_bits(), b.b.to_bits());
        }
        assert_eq!(copy.checksum().to_bits(), texture.checksum().to_bits());
    }

    #[test]
    fn test_wrong_side_rejected() {
        let codec = TextureSerdez::new(2);
        let texture = TextureObject::new(3);
        let mut buf = vec![0u8; 1024];

        assert!(matches!(
            codec.serialize(&texture, &mut buf),
            Err(CodecError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let codec = TextureSerdez::new(2);
        let buf = vec![0u8; 10];

        assert!(matches!(
            codec.deserialize(&buf),
            Err(CodecError::BufferTooSmall { needed: 96, .. })
        ));
    }

    #[test]
    fn test_texel_bounds() {
        let texture = TextureObject::new(2);
        assert!(texture.texel(1, 1).is_some());
        assert!(texture.texel(2, 0).is_none());
    }
}
