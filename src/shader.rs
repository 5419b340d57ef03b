use core::cmp::Ordering;

use vek::{Rgba, Vec4};

use crate::{
    error::RenderResult,
    interpolate::{Interpolator, Varyings},
};

/// Defines how a [`Shader`] will interact with the depth buffer of a surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct DepthMode {
    /// The test, if any, that occurs when comparing the depth of the new fragment with that of the current depth.
    pub test: Option<Ordering>,
    /// Whether the fragment's depth should be written to the depth buffer if the test was passed.
    pub write: bool,
}

impl DepthMode {
    pub const NONE: Self = Self {
        test: None,
        write: false,
    };

    pub const LESS_WRITE: Self = Self {
        test: Some(Ordering::Less),
        write: true,
    };

    pub const GREATER_WRITE: Self = Self {
        test: Some(Ordering::Greater),
        write: true,
    };

    pub const LESS_PASS: Self = Self {
        test: Some(Ordering::Less),
        write: false,
    };

    pub const GREATER_PASS: Self = Self {
        test: Some(Ordering::Greater),
        write: false,
    };

    /// Determine whether a fragment at depth `new` passes the test against the stored depth `old`.
    ///
    /// Comparisons involving NaN never pass.
    #[inline]
    pub fn passes(&self, new: f32, old: f32) -> bool {
        match self.test {
            Some(test) => new.partial_cmp(&old) == Some(test),
            None => true,
        }
    }
}

impl Default for DepthMode {
    fn default() -> Self {
        Self::LESS_WRITE
    }
}

/// A pair of vertex and fragment programs used to draw meshes with vertices of type `V`.
///
/// Conventionally, configuration such as transformation matrices and textures is stored as state within the shader
/// itself. That state is only ever read while drawing, so a single shader value is shared by every vertex and pixel.
/// Data that needs to travel from a vertex to the pixels of its triangles is returned from [`Shader::vertex`] as a
/// [`Shader::VsOut`] and read back with [`Interpolator::interpolate`] or [`Interpolator::flat`].
///
/// ```
/// use druck::{Interpolator, Mesh, RenderResult, Shader, Surface, Varying, Varyings};
/// use vek::{Rgba, Vec2, Vec3, Vec4};
///
/// struct Tint(Vec3<f32>);
///
/// impl Varyings for Tint {
///     fn varying(&self, name: &str) -> Option<Varying> {
///         (name == "tint").then(|| self.0.into())
///     }
/// }
///
/// struct Flat2d;
///
/// impl Shader<(Vec2<f32>, Vec3<f32>)> for Flat2d {
///     type VsOut = Tint;
///
///     fn vertex(&self, (pos, color): &(Vec2<f32>, Vec3<f32>)) -> (Vec4<f32>, Tint) {
///         (Vec4::new(pos.x, pos.y, 1.0, 1.0), Tint(*color))
///     }
///
///     fn fragment(&self, varyings: &Interpolator<'_, Tint>) -> RenderResult<Rgba<f32>> {
///         let tint: Vec3<f32> = varyings.interpolate("tint")?;
///         Ok(Rgba::new(tint.x, tint.y, tint.z, 1.0))
///     }
/// }
///
/// let mut mesh = Mesh::new();
/// let a = mesh.add_vertex((Vec2::new(-0.5, 0.5), Vec3::new(1.0, 0.0, 0.0)));
/// let b = mesh.add_vertex((Vec2::new(0.5, 0.5), Vec3::new(0.0, 1.0, 0.0)));
/// let c = mesh.add_vertex((Vec2::new(0.0, -0.5), Vec3::new(0.0, 0.0, 1.0)));
/// mesh.add_element(a, b, c);
///
/// let mut surface = Surface::new(64, 64)?;
/// let stats = surface.draw_mesh(&mesh, &Flat2d)?;
/// assert!(stats.fragments > 0);
/// # Ok::<(), druck::RenderError>(())
/// ```
pub trait Shader<V> {
    /// The data that gets passed on from the vertex stage to the fragment stage.
    type VsOut: Varyings + Send + Sync;

    /// Returns the [`DepthMode`] of this shader.
    #[inline]
    fn depth_mode(&self) -> DepthMode {
        DepthMode::default()
    }

    /// Transforms a vertex into a homogeneous clip-space position and the outputs to be carried to the fragment stage.
    ///
    /// Vertices with a non-positive `w` or a `z` of exactly zero cause their triangle to be skipped.
    fn vertex(&self, vertex: &V) -> (Vec4<f32>, Self::VsOut);

    /// Computes the colour of a single pixel covered by a triangle.
    ///
    /// Returning an error aborts the draw call that invoked it.
    fn fragment(&self, varyings: &Interpolator<'_, Self::VsOut>) -> RenderResult<Rgba<f32>>;
}

impl<'a, V, S: Shader<V> + ?Sized> Shader<V> for &'a S {
    type VsOut = S::VsOut;

    #[inline(always)]
    fn depth_mode(&self) -> DepthMode {
        (**self).depth_mode()
    }

    #[inline(always)]
    fn vertex(&self, vertex: &V) -> (Vec4<f32>, Self::VsOut) {
        (**self).vertex(vertex)
    }

    #[inline(always)]
    fn fragment(&self, varyings: &Interpolator<'_, Self::VsOut>) -> RenderResult<Rgba<f32>> {
        (**self).fragment(varyings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_depth_mode_is_strictly_closer_wins() {
        let mode = DepthMode::default();
        assert!(mode.passes(1.0, 2.0));
        assert!(!mode.passes(2.0, 2.0));
        assert!(!mode.passes(3.0, 2.0));
        assert!(mode.passes(5.0, f32::INFINITY));
        assert!(!mode.passes(f32::NAN, 1.0));
        assert!(mode.write);
    }

    #[test]
    fn other_depth_modes() {
        assert!(DepthMode::NONE.passes(3.0, 2.0));
        assert!(!DepthMode::NONE.write);
        assert!(DepthMode::GREATER_WRITE.passes(3.0, 2.0));
        assert!(!DepthMode::GREATER_PASS.passes(1.0, 2.0));
        assert!(!DepthMode::LESS_PASS.write);
    }

    #[test]
    fn fragment_outside_rasterizer_has_no_context() {
        struct Constant;
        impl Shader<()> for Constant {
            type VsOut = ();
            fn vertex(&self, _: &()) -> (Vec4<f32>, ()) {
                (Vec4::new(0.0, 0.0, 1.0, 1.0), ())
            }
            fn fragment(&self, varyings: &Interpolator<'_, ()>) -> RenderResult<Rgba<f32>> {
                let shade: f32 = varyings.interpolate("shade")?;
                Ok(Rgba::broadcast(shade))
            }
        }

        assert_eq!(
            Constant.fragment(&Interpolator::detached()),
            Err(crate::RenderError::NoActiveContext)
        );
    }
}
