use vek::{Vec2, Vec3, Vec4};

use crate::error::{RenderError, RenderResult};

/// A trait used to enable types to be interpolated throughout the rasterization process
pub trait Interpolate {
    /// Linearly scale three items of this type and sum them
    fn lerp3(a: Self, b: Self, c: Self, x: f32, y: f32, z: f32) -> Self;
}

// Default impls for certain types
macro_rules! impl_interpolate_for {
    ($t:ty) => {
        impl Interpolate for $t {
            #[inline(always)]
            fn lerp3(a: Self, b: Self, c: Self, x: f32, y: f32, z: f32) -> Self {
                a * x + b * y + c * z
            }
        }
    };
}
impl_interpolate_for!(f32);
impl_interpolate_for!(Vec2<f32>);
impl_interpolate_for!(Vec3<f32>);
impl_interpolate_for!(Vec4<f32>);

/// The value of a single varying, as reported by [`Varyings::varying`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Varying {
    Float(f32),
    Vec2(Vec2<f32>),
    Vec3(Vec3<f32>),
    Vec4(Vec4<f32>),
}

impl Varying {
    fn kind(&self) -> &'static str {
        match self {
            Varying::Float(_) => "f32",
            Varying::Vec2(_) => "Vec2<f32>",
            Varying::Vec3(_) => "Vec3<f32>",
            Varying::Vec4(_) => "Vec4<f32>",
        }
    }
}

/// Types that can be stored in a [`Varying`] and read back from one.
pub trait VaryingValue: Interpolate + Sized {
    /// Name used in error messages.
    const KIND: &'static str;

    fn from_varying(varying: Varying) -> Option<Self>;
}

macro_rules! impl_varying_value {
    ($t:ty, $variant:ident, $kind:literal) => {
        impl From<$t> for Varying {
            #[inline(always)]
            fn from(value: $t) -> Self {
                Varying::$variant(value)
            }
        }

        impl VaryingValue for $t {
            const KIND: &'static str = $kind;

            #[inline(always)]
            fn from_varying(varying: Varying) -> Option<Self> {
                match varying {
                    Varying::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}
impl_varying_value!(f32, Float, "f32");
impl_varying_value!(Vec2<f32>, Vec2, "Vec2<f32>");
impl_varying_value!(Vec3<f32>, Vec3, "Vec3<f32>");
impl_varying_value!(Vec4<f32>, Vec4, "Vec4<f32>");

/// The per-vertex output of a vertex stage, carried across the triangle to the fragment stage.
///
/// Implementors register their interpolable fields by name. Only registered fields can be read through an
/// [`Interpolator`], so a fragment stage can never observe data that the vertex stage did not explicitly emit.
///
/// ```
/// use druck::{Varying, Varyings};
/// use vek::Vec2;
///
/// struct VsOut {
///     uv: Vec2<f32>,
///     shade: f32,
/// }
///
/// impl Varyings for VsOut {
///     fn varying(&self, name: &str) -> Option<Varying> {
///         match name {
///             "uv" => Some(self.uv.into()),
///             "shade" => Some(self.shade.into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Varyings {
    /// Look up the value of the varying with the given name.
    fn varying(&self, name: &str) -> Option<Varying>;
}

impl Varyings for () {
    #[inline(always)]
    fn varying(&self, _: &str) -> Option<Varying> {
        None
    }
}

/// The interpolation state of the triangle currently being rasterized.
///
/// This is created when a triangle starts being rasterized and discarded when it is done. It holds the vertex
/// outputs of the triangle's three vertices (sorted from top to bottom), their inverse depths, and the position,
/// barycentric weights and depth of the pixel being shaded. The topmost vertex is vertex A, whose outputs
/// [`Interpolator::flat`] reads.
#[derive(Debug)]
pub struct VertexStates<'a, B> {
    pub(crate) outputs: &'a [B; 3],
    pub(crate) inv_depth: [f32; 3],
    pub(crate) weights: [f32; 3],
    pub(crate) depth: f32,
    pub(crate) pixel: [usize; 2],
}

impl<'a, B> VertexStates<'a, B> {
    pub(crate) fn new(outputs: &'a [B; 3], inv_depth: [f32; 3]) -> Self {
        Self {
            outputs,
            inv_depth,
            weights: [0.0; 3],
            depth: f32::INFINITY,
            pixel: [0; 2],
        }
    }

    /// The vertex outputs, in top-to-bottom screen order.
    pub fn outputs(&self) -> &[B; 3] {
        self.outputs
    }

    /// The inverse depth of each vertex, in the same order as [`VertexStates::outputs`].
    pub fn inv_depths(&self) -> [f32; 3] {
        self.inv_depth
    }

    /// The barycentric weights of the current pixel, in the same order as [`VertexStates::outputs`].
    pub fn weights(&self) -> [f32; 3] {
        self.weights
    }

    /// The perspective-correct depth of the current pixel.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// The coordinates of the current pixel within the surface.
    pub fn pixel(&self) -> [usize; 2] {
        self.pixel
    }

    fn fetch<T: VaryingValue>(&self, idx: usize, name: &str) -> RenderResult<T>
    where
        B: Varyings,
    {
        let varying = self.outputs[idx]
            .varying(name)
            .ok_or_else(|| RenderError::unknown_varying(name))?;
        T::from_varying(varying).ok_or_else(|| RenderError::VaryingTypeMismatch {
            name: name.into(),
            expected: T::KIND,
            found: varying.kind(),
        })
    }
}

/// A handle through which a fragment stage reads its varyings.
///
/// The rasterizer hands an active interpolator to [`Shader::fragment`](crate::Shader::fragment) for every shaded
/// pixel; the interpolator borrows the triangle's [`VertexStates`] only for the duration of that call. A
/// [`Interpolator::detached`] handle has no triangle to read from, and every read through it fails with
/// [`RenderError::NoActiveContext`].
#[derive(Debug)]
pub struct Interpolator<'a, B> {
    states: Option<&'a VertexStates<'a, B>>,
}

impl<'a, B> Clone for Interpolator<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B> Copy for Interpolator<'a, B> {}

impl<'a, B: Varyings> Interpolator<'a, B> {
    #[inline]
    pub(crate) fn active(states: &'a VertexStates<'a, B>) -> Self {
        Self {
            states: Some(states),
        }
    }

    /// An interpolator that is not attached to any triangle.
    pub fn detached() -> Self {
        Self { states: None }
    }

    /// The state of the triangle being rasterized, if any.
    pub fn states(&self) -> Option<&'a VertexStates<'a, B>> {
        self.states
    }

    fn context(&self) -> RenderResult<&'a VertexStates<'a, B>> {
        self.states.ok_or(RenderError::NoActiveContext)
    }

    /// Read the perspective-correct interpolation of the named varying at the current pixel.
    ///
    /// Each vertex's value is weighted by its barycentric weight and inverse depth, and the sum is scaled by the
    /// pixel's depth.
    pub fn interpolate<T: VaryingValue>(&self, name: &str) -> RenderResult<T> {
        let vs = self.context()?;
        let a = vs.fetch::<T>(0, name)?;
        let b = vs.fetch::<T>(1, name)?;
        let c = vs.fetch::<T>(2, name)?;
        let [wa, wb, wc] = vs.weights;
        let [ia, ib, ic] = vs.inv_depth;
        Ok(T::lerp3(
            a,
            b,
            c,
            wa * ia * vs.depth,
            wb * ib * vs.depth,
            wc * ic * vs.depth,
        ))
    }

    /// Read the named varying of the triangle's topmost vertex without interpolating it (flat shading).
    ///
    /// Of several vertices sharing the topmost row, the one submitted first is used.
    pub fn flat<T: VaryingValue>(&self, name: &str) -> RenderResult<T> {
        self.context()?.fetch(0, name)
    }
}
