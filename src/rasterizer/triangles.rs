use core::{cmp::Ordering, ops::Range};

use vek::Vec2;

use super::Band;
use crate::{
    error::RenderResult,
    interpolate::{Interpolator, Varyings, VertexStates},
    shader::{DepthMode, Shader},
    surface::Color,
};

/// The reason a triangle was skipped before any of its pixels were considered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Rejection {
    /// A vertex has a non-positive `w` or a zero `z` in clip space.
    BehindCamera,
    /// The triangle covers no area in pixel space.
    Degenerate,
}

/// A triangle that has passed through the vertex stage and been projected into pixel space.
///
/// Vertices are sorted by ascending pixel-space y (apex, middle, base), and their outputs and inverse depths are
/// kept in the same order. Vertices on the same row keep their submission order.
pub(crate) struct Triangle<B> {
    pos: [Vec2<f32>; 3],
    area: f32,
    outputs: [B; 3],
    inv_depth: [f32; 3],
}

#[inline(always)]
fn triangle_area(a: Vec2<f32>, b: Vec2<f32>, c: Vec2<f32>) -> f32 {
    0.5 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)).abs()
}

/// Find the x position of an edge given its y. Horizontal edges report their starting x.
#[inline(always)]
fn edge_x(from: Vec2<f32>, to: Vec2<f32>, y: f32) -> f32 {
    let dy = to.y - from.y;
    if dy == 0.0 {
        from.x
    } else {
        from.x + (to.x - from.x) * (y - from.y) / dy
    }
}

/// The integers in `start..end`, restricted to `bounds`.
#[inline(always)]
fn clamp_span(start: f32, end: f32, bounds: &Range<usize>) -> Range<usize> {
    let (lo, hi) = (bounds.start as f32, bounds.end as f32);
    start.max(lo).min(hi) as usize..end.max(lo).min(hi) as usize
}

impl<B> Triangle<B> {
    /// Run the vertex stage for each vertex and project the results onto a target of the given size.
    pub(crate) fn setup<V, S>(
        shader: &S,
        [a, b, c]: [&V; 3],
        [width, height]: [usize; 2],
    ) -> Result<Self, Rejection>
    where
        S: Shader<V, VsOut = B> + ?Sized,
    {
        let clip = [shader.vertex(a), shader.vertex(b), shader.vertex(c)];
        if clip.iter().any(|(pos, _)| pos.w <= 0.0 || pos.z == 0.0) {
            return Err(Rejection::BehindCamera);
        }

        let size = Vec2::new(width as f32, height as f32);
        let [a, b, c] = clip;
        let mut corners = [a, b, c].map(|(pos, out)| {
            // Perspective division
            let ndc = pos.xyz() / pos.w;
            // Convert to pixel coordinates, with +y pointing down the surface
            let px = Vec2::new(
                (ndc.x + 1.0) * 0.5 * size.x,
                size.y - (ndc.y + 1.0) * 0.5 * size.y,
            );
            (px, 1.0 / pos.z, out)
        });
        corners.sort_by(|a, b| a.0.y.partial_cmp(&b.0.y).unwrap_or(Ordering::Equal));
        let [(a, ia, va), (b, ib, vb), (c, ic, vc)] = corners;

        let area = triangle_area(a, b, c);
        // Also catches NaN areas
        if !(area > 0.0) {
            return Err(Rejection::Degenerate);
        }

        Ok(Self {
            pos: [a, b, c],
            area,
            outputs: [va, vb, vc],
            inv_depth: [ia, ib, ic],
        })
    }
}

impl<B: Varyings> Triangle<B> {
    /// Scan-convert the triangle into the given band, returning the number of fragments written.
    pub(crate) fn rasterize<V, S>(&self, shader: &S, band: &mut Band<'_>) -> RenderResult<usize>
    where
        S: Shader<V, VsOut = B> + ?Sized,
    {
        let [a, b, c] = self.pos;
        let depth_mode = shader.depth_mode();
        let mut states = VertexStates::new(&self.outputs, self.inv_depth);

        // Apex to middle covers a.y <= y < b.y, middle to base covers b.y <= y <= c.y
        let upper = clamp_span(a.y.ceil(), b.y.ceil(), &band.rows);
        let lower = clamp_span(b.y.ceil(), c.y.floor() + 1.0, &band.rows);

        let written = self.scan_segment(shader, &mut states, band, depth_mode, (a, b), upper)?;
        Ok(written + self.scan_segment(shader, &mut states, band, depth_mode, (b, c), lower)?)
    }

    fn scan_segment<V, S>(
        &self,
        shader: &S,
        states: &mut VertexStates<'_, B>,
        band: &mut Band<'_>,
        depth_mode: DepthMode,
        (top, bottom): (Vec2<f32>, Vec2<f32>),
        rows: Range<usize>,
    ) -> RenderResult<usize>
    where
        S: Shader<V, VsOut = B> + ?Sized,
    {
        let [a, b, c] = self.pos;
        let columns = 0..band.width;
        let mut written = 0;

        for y in rows {
            let fy = y as f32;
            // One bound lies on the long edge (apex to base), the other on the segment's own edge
            let long = edge_x(a, c, fy);
            let short = edge_x(top, bottom, fy);
            let (left, right) = if long <= short { (long, short) } else { (short, long) };

            for x in clamp_span(left.ceil(), right.floor() + 1.0, &columns) {
                let p = Vec2::new(x as f32, fy);
                states.weights = [
                    triangle_area(p, b, c) / self.area,
                    triangle_area(p, c, a) / self.area,
                    triangle_area(p, a, b) / self.area,
                ];

                let inv_depth = states
                    .weights
                    .iter()
                    .zip(states.inv_depth)
                    .map(|(w, i)| w * i)
                    .sum::<f32>();
                if inv_depth == 0.0 {
                    continue;
                }
                let depth = 1.0 / inv_depth;
                if depth <= 0.0 || !depth_mode.passes(depth, band.depth_at(x, y)) {
                    continue;
                }
                states.depth = depth;
                states.pixel = [x, y];

                let color = shader.fragment(&Interpolator::active(states))?;
                band.write(x, y, Color::from_floats(color), depth_mode.write.then_some(depth));
                written += 1;
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use approx::assert_relative_eq;
    use vek::{Rgba, Vec4};

    /// Passes clip-space positions straight through.
    struct Passthrough;

    impl Shader<Vec4<f32>> for Passthrough {
        type VsOut = ();

        fn vertex(&self, pos: &Vec4<f32>) -> (Vec4<f32>, ()) {
            (*pos, ())
        }

        fn fragment(&self, _: &Interpolator<'_, ()>) -> RenderResult<Rgba<f32>> {
            Ok(Rgba::new(1.0, 1.0, 1.0, 1.0))
        }
    }

    fn setup(verts: [Vec4<f32>; 3]) -> Result<Triangle<()>, Rejection> {
        let [a, b, c] = &verts;
        Triangle::setup(&Passthrough, [a, b, c], [8, 8])
    }

    #[test]
    fn area_is_unsigned() {
        let (a, b, c) = (Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0));
        assert_relative_eq!(triangle_area(a, b, c), 8.0);
        assert_relative_eq!(triangle_area(a, c, b), 8.0);
    }

    #[test]
    fn edges_are_solved_for_x() {
        let (a, b) = (Vec2::new(0.0, 0.0), Vec2::new(4.0, 8.0));
        assert_relative_eq!(edge_x(a, b, 2.0), 1.0);
        assert_relative_eq!(edge_x(b, a, 6.0), 3.0);
        assert_relative_eq!(edge_x(a, Vec2::new(5.0, 0.0), 0.0), 0.0);
    }

    #[test]
    fn spans_are_clamped() {
        assert_eq!(clamp_span(-3.0, 2.0, &(0..8)), 0..2);
        assert_eq!(clamp_span(6.0, 20.0, &(0..8)), 6..8);
        assert_eq!(clamp_span(f32::NAN, f32::NAN, &(2..8)), 2..2);
        assert!(clamp_span(5.0, 3.0, &(0..8)).is_empty());
    }

    #[test]
    fn setup_projects_and_sorts() {
        let tri = setup([
            Vec4::new(-1.0, 0.0, 1.0, 1.0),
            Vec4::new(0.0, 1.0, 2.0, 1.0),
            Vec4::new(-1.0, 1.0, 4.0, 1.0),
        ])
        .unwrap();
        // Sorted by y, ties keep submission order
        assert_eq!(tri.pos, [Vec2::new(4.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(0.0, 4.0)]);
        assert_eq!(tri.inv_depth, [0.5, 0.25, 1.0]);
        assert_relative_eq!(tri.area, 8.0);
    }

    #[test]
    fn setup_rejects_unprojectable_vertices() {
        let ok = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let right = Vec4::new(1.0, 0.0, 1.0, 1.0);
        for bad in [
            Vec4::new(0.0, 1.0, 1.0, 0.0),
            Vec4::new(0.0, 1.0, 1.0, -1.0),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
        ] {
            assert_eq!(setup([ok, right, bad]).err(), Some(Rejection::BehindCamera));
        }
    }

    #[test]
    fn setup_rejects_zero_area() {
        let tri = setup([
            Vec4::new(-1.0, -1.0, 1.0, 1.0),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
            Vec4::new(1.0, 1.0, 1.0, 1.0),
        ]);
        assert_eq!(tri.err(), Some(Rejection::Degenerate));
    }

    #[test]
    fn fragment_errors_abort_rasterization() {
        struct Broken;
        impl Shader<Vec4<f32>> for Broken {
            type VsOut = ();
            fn vertex(&self, pos: &Vec4<f32>) -> (Vec4<f32>, ()) {
                (*pos, ())
            }
            fn fragment(&self, v: &Interpolator<'_, ()>) -> RenderResult<Rgba<f32>> {
                v.flat::<f32>("missing").map(Rgba::broadcast)
            }
        }

        let verts = [
            Vec4::new(-1.0, 1.0, 1.0, 1.0),
            Vec4::new(1.0, 1.0, 1.0, 1.0),
            Vec4::new(-1.0, -1.0, 1.0, 1.0),
        ];
        let [a, b, c] = &verts;
        let tri = Triangle::setup(&Broken, [a, b, c], [4, 4]).unwrap();
        let mut color = vec![Color::BLACK; 16];
        let mut depth = vec![f32::INFINITY; 16];
        let mut band = Band::new(&mut color, Some(&mut depth[..]), 4, 0..4);
        assert_eq!(
            tri.rasterize::<Vec4<f32>, _>(&Broken, &mut band),
            Err(RenderError::UnknownVarying {
                name: "missing".into()
            })
        );
        assert!(color.iter().all(|c| *c == Color::BLACK));
    }
}
