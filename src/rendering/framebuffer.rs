/// Color target for software rendering.
///
/// Memory layout:
/// - One packed `AtomicU32` per pixel, R in the lowest byte (`0xAABBGGRR`),
///   so the in-memory byte order of a row is R,G,B,A on little-endian targets
/// - Row 0 is the bottom of the view (the viewport maps clip `y = -1` there);
///   the presentation helpers flip to top-down order
///
/// Workers write pixels concurrently with relaxed stores. Two triangles
/// covering the same pixel at the same time race on it; the last store wins.
use crate::parallel::{parallel_for, TaskExecutor};
use glam::Vec3;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// 8-bit RGBA color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Linear `[0, 1]` color to opaque 8-bit, clamping each channel.
    #[inline]
    pub fn from_unit_vec3(color: Vec3) -> Self {
        let c = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        Self::opaque(c.x as u8, c.y as u8, c.z as u8)
    }

    #[inline(always)]
    pub const fn pack(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    #[inline(always)]
    pub const fn unpack(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self { r, g, b, a }
    }

    /// Softbuffer pixel layout: `0x00RRGGBB`.
    #[inline]
    pub const fn to_softbuffer(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

pub struct ColorBuffer {
    width: usize,
    height: usize,
    pixels: Vec<AtomicU32>,
}

impl ColorBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let pixels = (0..width * height)
            .map(|_| AtomicU32::new(Rgba::TRANSPARENT.pack()))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width * std::mem::size_of::<u32>()
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    pub fn write(&self, x: usize, y: usize, color: Rgba) {
        self.pixels[self.index(x, y)].store(color.pack(), Ordering::Relaxed);
    }

    #[inline]
    pub fn read(&self, x: usize, y: usize) -> Rgba {
        Rgba::unpack(self.pixels[self.index(x, y)].load(Ordering::Relaxed))
    }

    /// Fill every pixel with `color`, one row per runner index.
    pub fn clear(&self, executor: &TaskExecutor, color: Rgba) {
        let packed = color.pack();
        let width = self.width;
        parallel_for(executor, 0..self.height, None, |_, row| {
            for pixel in &self.pixels[row * width..(row + 1) * width] {
                pixel.store(packed, Ordering::Relaxed);
            }
        });
    }

    /// Top-down RGBA8 bytes, ready for an image encoder.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.width * self.height * 4];
        if self.width == 0 {
            return bytes;
        }
        bytes
            .par_chunks_mut(self.width * 4)
            .enumerate()
            .for_each(|(out_row, chunk)| {
                let row = self.height - 1 - out_row;
                for (x, texel) in chunk.chunks_exact_mut(4).enumerate() {
                    let c = self.read(x, row);
                    texel.copy_from_slice(&[c.r, c.g, c.b, c.a]);
                }
            });
        bytes
    }

    /// Copy into a top-down `0x00RRGGBB` surface such as a softbuffer frame.
    /// `target` must hold at least `width * height` pixels.
    pub fn copy_to_softbuffer(&self, target: &mut [u32]) {
        if self.width == 0 {
            return;
        }
        target[..self.width * self.height]
            .par_chunks_mut(self.width)
            .enumerate()
            .for_each(|(out_row, chunk)| {
                let row = self.height - 1 - out_row;
                for (x, pixel) in chunk.iter_mut().enumerate() {
                    *pixel = self.read(x, row).to_softbuffer();
                }
            });
    }

    /// Top-down `0x00RRGGBB` pixels.
    pub fn to_argb_u32(&self) -> Vec<u32> {
        let mut out = vec![0u32; self.width * self.height];
        self.copy_to_softbuffer(&mut out);
        out
    }
}

/// Gamma lookup for 8-bit channels (display gamma ≈ 2.2 encode curve).
#[rustfmt::skip]
pub const GAMMA_TABLE: [u8; 256] = [
    0, 21, 28, 34, 39, 43, 46, 50, 53, 56, 59, 61, 64, 66, 68, 70,
    72, 74, 76, 78, 80, 82, 84, 85, 87, 89, 90, 92, 93, 95, 96, 98,
    99, 101, 102, 103, 105, 106, 107, 109, 110, 111, 112, 114, 115, 116, 117, 118,
    119, 120, 122, 123, 124, 125, 126, 127, 128, 129, 130, 131, 132, 133, 134, 135,
    136, 137, 138, 139, 140, 141, 142, 143, 144, 144, 145, 146, 147, 148, 149, 150,
    151, 151, 152, 153, 154, 155, 156, 156, 157, 158, 159, 160, 160, 161, 162, 163,
    164, 164, 165, 166, 167, 167, 168, 169, 170, 170, 171, 172, 173, 173, 174, 175,
    175, 176, 177, 178, 178, 179, 180, 180, 181, 182, 182, 183, 184, 184, 185, 186,
    186, 187, 188, 188, 189, 190, 190, 191, 192, 192, 193, 194, 194, 195, 195, 196,
    197, 197, 198, 199, 199, 200, 200, 201, 202, 202, 203, 203, 204, 205, 205, 206,
    206, 207, 207, 208, 209, 209, 210, 210, 211, 212, 212, 213, 213, 214, 214, 215,
    215, 216, 217, 217, 218, 218, 219, 219, 220, 220, 221, 221, 222, 223, 223, 224,
    224, 225, 225, 226, 226, 227, 227, 228, 228, 229, 229, 230, 230, 231, 231, 232,
    232, 233, 233, 234, 234, 235, 235, 236, 236, 237, 237, 238, 238, 239, 239, 240,
    240, 241, 241, 242, 242, 243, 243, 244, 244, 245, 245, 246, 246, 247, 247, 248,
    248, 249, 249, 249, 250, 250, 251, 251, 252, 252, 253, 253, 254, 254, 255, 255,
];

/// Apply [`GAMMA_TABLE`] to the color channels; alpha is untouched.
#[inline]
pub fn gamma_adjust(color: Rgba) -> Rgba {
    Rgba::new(
        GAMMA_TABLE[color.r as usize],
        GAMMA_TABLE[color.g as usize],
        GAMMA_TABLE[color.b as usize],
        color.a,
    )
}
