//! A CPU software rasterizer that renders triangle meshes into an in-memory colour and depth buffer.
//!
//! Rendering is driven by a [`Shader`]: its vertex stage maps each vertex of a [`Mesh`] to clip space and emits a
//! bundle of [`Varyings`], and its fragment stage computes the colour of every pixel the triangle covers, reading
//! perspective-correct interpolations of those varyings through an [`Interpolator`]. Pixels are written to a
//! [`Surface`], which doubles as a texture via [`Surface::sample`].
//!
//! Only triangles with a vertex behind the camera are rejected; there is no further clipping. Anti-aliasing and
//! mipmapping are not supported.

#[cfg(feature = "image")]
extern crate image_ as image;

pub mod error;
pub mod interpolate;
pub mod mesh;
pub mod rasterizer;
pub mod shader;
pub mod surface;

// Reexports
pub use self::{
    error::{RenderError, RenderResult},
    interpolate::{Interpolate, Interpolator, Varying, VaryingValue, Varyings, VertexStates},
    mesh::Mesh,
    rasterizer::DrawStats,
    shader::{DepthMode, Shader},
    surface::{Color, Surface},
};
