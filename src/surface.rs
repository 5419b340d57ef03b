use core::fmt;

use vek::{Rgba, Vec2};

use crate::error::{RenderError, RenderResult};

/// An 8-bit-per-channel RGBA colour, as stored in a [`Surface`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Convert a normalised colour to 8-bit channels by scaling each channel by 255 and truncating.
    ///
    /// Channels are not clamped first. Values outside of `0.0..=1.0` saturate at the ends of the `u8` range.
    #[inline]
    pub fn from_floats(color: Rgba<f32>) -> Self {
        Self {
            r: (color.r * 255.0) as u8,
            g: (color.g * 255.0) as u8,
            b: (color.b * 255.0) as u8,
            a: (color.a * 255.0) as u8,
        }
    }

    /// Convert this colour to a normalised colour with channels in `0.0..=1.0`.
    #[inline]
    pub fn to_floats(self) -> Rgba<f32> {
        Rgba::new(self.r, self.g, self.b, self.a).map(|e| e as f32 / 255.0)
    }
}

/// A framebuffer made of a colour buffer and an optional depth buffer.
///
/// Both buffers are stored row-major and always hold exactly `width * height` items. A surface is uniquely owned:
/// it may be moved, but never implicitly copied.
///
/// Pixel access is bounds-checked. Reading outside of the surface yields [`Color::BLACK`] or an infinite depth, and
/// writing outside of it does nothing.
pub struct Surface {
    size: [usize; 2],
    color: Vec<Color>,
    depth: Option<Vec<f32>>,
}

impl Surface {
    /// Create a surface with both a colour and a depth buffer, cleared to black and an infinite depth.
    pub fn new(width: usize, height: usize) -> RenderResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            size: [width, height],
            color: vec![Color::BLACK; len],
            depth: Some(vec![f32::INFINITY; len]),
        })
    }

    /// Create a surface without a depth buffer, such as one used as a texture.
    pub fn without_depth(width: usize, height: usize) -> RenderResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            size: [width, height],
            color: vec![Color::BLACK; len],
            depth: None,
        })
    }

    /// Create a surface by copying the given colour buffer and, optionally, depth buffer.
    pub fn from_buffers(
        color: &[Color],
        depth: Option<&[f32]>,
        width: usize,
        height: usize,
    ) -> RenderResult<Self> {
        let len = checked_len(width, height)?;
        for found in core::iter::once(color.len()).chain(depth.map(<[f32]>::len)) {
            if found != len {
                return Err(RenderError::BufferSizeMismatch {
                    expected: len,
                    found,
                });
            }
        }
        Ok(Self {
            size: [width, height],
            color: color.to_vec(),
            depth: depth.map(<[f32]>::to_vec),
        })
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.size[0]
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.size[1]
    }

    #[inline]
    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// View the colour buffer as a row-major slice.
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.color
    }

    /// View the depth buffer as a row-major slice, if this surface has one.
    #[inline]
    pub fn depths(&self) -> Option<&[f32]> {
        self.depth.as_deref()
    }

    /// Copy the colour buffer out as tightly packed, row-major RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.color
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, c.a])
            .collect()
    }

    /// Split the surface into its raw colour and depth buffers for the rasterizer.
    #[inline]
    pub(crate) fn buffers_mut(&mut self) -> (&mut [Color], Option<&mut [f32]>) {
        (&mut self.color, self.depth.as_deref_mut())
    }

    /// Determine whether the given pixel lies within the surface.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.size[0] && y >= 0 && (y as usize) < self.size[1]
    }

    #[inline]
    fn linear_index(&self, x: i32, y: i32) -> Option<usize> {
        if self.contains(x, y) {
            Some(y as usize * self.size[0] + x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get_color_at(&self, x: i32, y: i32) -> Color {
        self.linear_index(x, y)
            .map_or(Color::BLACK, |idx| self.color[idx])
    }

    #[inline]
    pub fn set_color_at(&mut self, x: i32, y: i32, color: Color) {
        if let Some(idx) = self.linear_index(x, y) {
            self.color[idx] = color;
        }
    }

    /// Get the depth at the given pixel. Surfaces without a depth buffer report an infinite depth everywhere.
    #[inline]
    pub fn get_depth_at(&self, x: i32, y: i32) -> f32 {
        match (&self.depth, self.linear_index(x, y)) {
            (Some(depth), Some(idx)) => depth[idx],
            _ => f32::INFINITY,
        }
    }

    #[inline]
    pub fn set_depth_at(&mut self, x: i32, y: i32, depth: f32) {
        if let Some(idx) = self.linear_index(x, y) {
            if let Some(buf) = &mut self.depth {
                buf[idx] = depth;
            }
        }
    }

    /// Sample the surface as a wrapping texture using nearest-neighbour filtering.
    ///
    /// Both coordinates wrap into `0.0..1.0`. `u = 0` is the left edge and `v = 0` is the bottom edge.
    pub fn sample(&self, uv: Vec2<f32>) -> Rgba<f32> {
        let [width, height] = self.size;
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        // `rem_euclid` may round tiny negative inputs up to exactly 1.0
        let x = ((u * width as f32) as usize).min(width - 1);
        let row = ((v * height as f32) as usize).min(height - 1);
        // Row `k` counted from the bottom covers `k/h <= v < (k+1)/h`, so every row is reachable
        let y = height - 1 - row;
        self.color[y * width + x].to_floats()
    }

    /// Resize the surface, clearing its contents. Does nothing if the size is unchanged.
    pub fn resize(&mut self, width: usize, height: usize) -> RenderResult<()> {
        if self.size == [width, height] {
            return Ok(());
        }
        let len = checked_len(width, height)?;
        self.size = [width, height];
        self.color = vec![Color::BLACK; len];
        if let Some(depth) = &mut self.depth {
            *depth = vec![f32::INFINITY; len];
        }
        Ok(())
    }

    /// Reset every colour to black and every depth to infinity.
    pub fn clear(&mut self) {
        self.color.iter_mut().for_each(|c| *c = Color::BLACK);
        if let Some(depth) = &mut self.depth {
            depth.iter_mut().for_each(|d| *d = f32::INFINITY);
        }
    }

    /// Copy the whole of `src` into the given rectangle of this surface, resizing with nearest-neighbour sampling.
    ///
    /// The rectangle may extend beyond this surface; pixels falling outside of it are dropped.
    pub fn blit_buffer(
        &mut self,
        src: &Surface,
        dest_x: i32,
        dest_y: i32,
        dest_width: usize,
        dest_height: usize,
    ) {
        let [src_width, src_height] = src.size;
        for dy in 0..dest_height {
            let src_y = (dy as f32 / dest_height as f32 * src_height as f32) as i32;
            for dx in 0..dest_width {
                let src_x = (dx as f32 / dest_width as f32 * src_width as f32) as i32;
                let pixel = src.get_color_at(src_x, src_y);
                self.set_color_at(dest_x + dx as i32, dest_y + dy as i32, pixel);
            }
        }
    }
}

fn checked_len(width: usize, height: usize) -> RenderResult<usize> {
    match width.checked_mul(height) {
        Some(len) if len > 0 => Ok(len),
        _ => Err(RenderError::InvalidDimensions { width, height }),
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Surface(dimensions: {:?}, depth: {})",
            self.size,
            self.has_depth()
        )
    }
}

#[cfg(feature = "image")]
impl TryFrom<&image::RgbaImage> for Surface {
    type Error = RenderError;

    /// Copy an image into a colour-only surface, usually for use as a texture.
    fn try_from(img: &image::RgbaImage) -> RenderResult<Self> {
        let mut surface = Self::without_depth(img.width() as usize, img.height() as usize)?;
        surface
            .color
            .iter_mut()
            .zip(img.pixels())
            .for_each(|(c, px)| *c = Color::rgba(px[0], px[1], px[2], px[3]));
        Ok(surface)
    }
}

#[cfg(feature = "image")]
impl Surface {
    /// Copy the colour buffer into an image, for saving or presentation.
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let c = self.get_color_at(x as i32, y as i32);
            image::Rgba([c.r, c.g, c.b, c.a])
        })
    }
}
