//! Scan conversion of triangle meshes into a [`Surface`].
//!
//! Each triangle is drawn in two stages. Set-up runs the vertex stage on all three vertices, rejects triangles with
//! vertices behind the camera or no visible area, performs perspective division and sorts the vertices from top to
//! bottom. Scanning then fills the two trapezoids either side of the middle vertex row by row, depth tests every
//! covered pixel and hands those that survive to the fragment stage.
//!
//! With the `par` feature, large surfaces are split into horizontal bands of rows that are scanned on separate
//! threads. Every band visits the triangles in submission order, so the output is identical to a sequential draw.
//! Bands journal their writes while drawing. When a fragment stage fails, the writes a sequential draw would never
//! have made are undone, so aborted draws leave the same pixels behind too.

mod triangles;

use core::ops::Range;

use self::triangles::Triangle;
#[cfg(feature = "par")]
use crate::error::RenderError;
use crate::{
    error::RenderResult,
    mesh::Mesh,
    shader::Shader,
    surface::{Color, Surface},
};

/// Counters describing a completed draw call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Triangles submitted to the rasterizer.
    pub triangles: usize,
    /// Triangles skipped during set-up because they were behind the camera or degenerate.
    pub rejected: usize,
    /// Pixels that passed the depth test and were shaded.
    pub fragments: usize,
}

/// A run of whole rows of a surface's buffers that a rasterizer has exclusive access to.
pub(crate) struct Band<'a> {
    color: &'a mut [Color],
    depth: Option<&'a mut [f32]>,
    width: usize,
    rows: Range<usize>,
    #[cfg(feature = "par")]
    journal: Option<Vec<Overwritten>>,
}

/// The contents of a pixel from before it was written, kept so that the write can be undone.
#[cfg(feature = "par")]
#[derive(Copy, Clone, Debug)]
struct Overwritten {
    idx: usize,
    color: Color,
    depth: f32,
}

impl<'a> Band<'a> {
    pub(crate) fn new(
        color: &'a mut [Color],
        depth: Option<&'a mut [f32]>,
        width: usize,
        rows: Range<usize>,
    ) -> Self {
        Self {
            color,
            depth,
            width,
            rows,
            #[cfg(feature = "par")]
            journal: None,
        }
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        (y - self.rows.start) * self.width + x
    }

    #[inline(always)]
    pub(crate) fn depth_at(&self, x: usize, y: usize) -> f32 {
        let idx = self.index(x, y);
        self.depth.as_ref().map_or(f32::INFINITY, |depth| depth[idx])
    }

    #[inline(always)]
    pub(crate) fn write(&mut self, x: usize, y: usize, color: Color, depth: Option<f32>) {
        let idx = self.index(x, y);
        #[cfg(feature = "par")]
        {
            if let Some(journal) = &mut self.journal {
                journal.push(Overwritten {
                    idx,
                    color: self.color[idx],
                    depth: self.depth.as_ref().map_or(f32::INFINITY, |d| d[idx]),
                });
            }
        }
        self.color[idx] = color;
        if let (Some(buf), Some(depth)) = (self.depth.as_deref_mut(), depth) {
            buf[idx] = depth;
        }
    }
}

#[cfg(feature = "par")]
impl<'a> Band<'a> {
    /// Record every subsequent write so that it can be undone.
    fn journaled(mut self) -> Self {
        self.journal = Some(Vec::new());
        self
    }

    fn journal_len(&self) -> usize {
        self.journal.as_ref().map_or(0, Vec::len)
    }

    /// Restore every pixel written since the journal held `len` entries, newest first.
    fn undo_since(&mut self, len: usize) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        for w in journal.drain(len..).rev() {
            self.color[w.idx] = w.color;
            if let Some(depth) = self.depth.as_deref_mut() {
                depth[w.idx] = w.depth;
            }
        }
    }

    /// Drop the first `len` journal entries; those writes can no longer be undone.
    fn forget(&mut self, len: usize) {
        if let Some(journal) = &mut self.journal {
            journal.drain(..len);
        }
    }
}

impl Surface {
    /// Draw every triangle of a mesh onto this surface using the given shader.
    ///
    /// If an element references a missing vertex or the fragment stage returns an error, drawing stops and the error
    /// is returned. Pixels written before that point are left in place. With the `par` feature the fragment stage may
    /// also have run for pixels past that point, but none of them are written.
    pub fn draw_mesh<V, S>(&mut self, mesh: &Mesh<V>, shader: &S) -> RenderResult<DrawStats>
    where
        S: Shader<V> + Sync + ?Sized,
    {
        render(self, mesh.triangles(), shader)
    }

    /// Draw a single triangle onto this surface using the given shader.
    pub fn draw_triangle<V, S>(&mut self, a: &V, b: &V, c: &V, shader: &S) -> RenderResult<DrawStats>
    where
        S: Shader<V> + Sync + ?Sized,
    {
        render(self, core::iter::once(Ok([a, b, c])), shader)
    }
}

fn render<'v, V, S, I>(surface: &mut Surface, triangles: I, shader: &S) -> RenderResult<DrawStats>
where
    V: 'v,
    S: Shader<V> + Sync + ?Sized,
    I: Iterator<Item = RenderResult<[&'v V; 3]>>,
{
    #[cfg(feature = "par")]
    let bands = band_count(surface.size()).max(1);
    #[cfg(not(feature = "par"))]
    let bands = 1;

    #[cfg(feature = "par")]
    let r = if bands > 1 {
        render_par(surface, triangles, shader, bands)
    } else {
        render_seq(surface, triangles, shader)
    };
    #[cfg(not(feature = "par"))]
    let r = render_seq(surface, triangles, shader);

    match &r {
        Ok(stats) => log::debug!(
            "drew {} triangles ({} rejected, {} fragments) in {} band(s)",
            stats.triangles,
            stats.rejected,
            stats.fragments,
            bands,
        ),
        Err(err) => log::warn!("draw call aborted: {}", err),
    }
    r
}

fn setup<V, S>(
    shader: &S,
    verts: [&V; 3],
    size: [usize; 2],
    stats: &mut DrawStats,
) -> Option<Triangle<S::VsOut>>
where
    S: Shader<V> + ?Sized,
{
    stats.triangles += 1;
    match Triangle::setup(shader, verts, size) {
        Ok(tri) => Some(tri),
        Err(reason) => {
            stats.rejected += 1;
            log::trace!("skipping triangle {}: {:?}", stats.triangles - 1, reason);
            None
        }
    }
}

fn render_seq<'v, V, S, I>(surface: &mut Surface, triangles: I, shader: &S) -> RenderResult<DrawStats>
where
    V: 'v,
    S: Shader<V> + ?Sized,
    I: Iterator<Item = RenderResult<[&'v V; 3]>>,
{
    let size = surface.size();
    let (color, depth) = surface.buffers_mut();
    let mut band = Band::new(color, depth, size[0], 0..size[1]);

    let mut stats = DrawStats::default();
    for verts in triangles {
        if let Some(tri) = setup(shader, verts?, size, &mut stats) {
            stats.fragments += tri.rasterize::<V, S>(shader, &mut band)?;
        }
    }
    Ok(stats)
}

/// The number of bands worth splitting a surface of the given size into.
#[cfg(feature = "par")]
fn band_count([width, height]: [usize; 2]) -> usize {
    const FRAGMENTS_PER_BAND: usize = 20_000; // Magic number, maybe make this configurable?
    let band_rows = (FRAGMENTS_PER_BAND / width.max(1)).max(1);
    (height / band_rows).min(num_cpus::get())
}

/// The state of one band of a parallel draw once its thread has finished.
#[cfg(feature = "par")]
struct BandOutcome<'a> {
    band: Band<'a>,
    /// `(triangle, journal length)` pairs marking where each triangle's writes start in the journal.
    marks: Vec<(usize, usize)>,
    fragments: usize,
    error: Option<(usize, RenderError)>,
}

#[cfg(feature = "par")]
impl<'a> BandOutcome<'a> {
    /// Undo the writes of every triangle from `first` onwards.
    fn rollback(&mut self, first: usize) {
        if let Some(&(_, start)) = self.marks.iter().find(|(tri, _)| *tri >= first) {
            self.band.undo_since(start);
        }
    }

    /// Stop tracking the writes of triangles before `first`.
    fn forget_before(&mut self, first: usize) {
        let keep = self.marks.partition_point(|(tri, _)| *tri < first);
        if keep == 0 {
            return;
        }
        let cut = self
            .marks
            .get(keep)
            .map_or(self.band.journal_len(), |&(_, start)| start);
        self.marks.drain(..keep);
        self.marks.iter_mut().for_each(|(_, start)| *start -= cut);
        self.band.forget(cut);
    }
}

#[cfg(feature = "par")]
fn render_par<'v, V, S, I>(
    surface: &mut Surface,
    triangles: I,
    shader: &S,
    bands: usize,
) -> RenderResult<DrawStats>
where
    V: 'v,
    S: Shader<V> + Sync + ?Sized,
    I: Iterator<Item = RenderResult<[&'v V; 3]>>,
{
    use std::{
        panic,
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    let size @ [width, height] = surface.size();

    // Set-up happens once, up front; only scanning is split between threads. Triangles before a bad element are
    // still drawn.
    let mut stats = DrawStats::default();
    let mut tris = Vec::new();
    let mut setup_error = None;
    for verts in triangles {
        match verts {
            Ok(verts) => tris.extend(setup(shader, verts, size, &mut stats)),
            Err(err) => {
                setup_error = Some(err);
                break;
            }
        }
    }

    let band_rows = (height + bands - 1) / bands;
    let (color, depth) = surface.buffers_mut();
    let mut depth_chunks = depth.map(|depth| depth.chunks_mut(band_rows * width));
    let targets = color
        .chunks_mut(band_rows * width)
        .enumerate()
        .map(|(i, color)| {
            let start = i * band_rows;
            let rows = start..start + color.len() / width;
            let depth = depth_chunks.as_mut().and_then(Iterator::next);
            Band::new(color, depth, width, rows).journaled()
        })
        .collect::<Vec<_>>();

    // The earliest triangle known to have failed in any band
    let failed = AtomicUsize::new(usize::MAX);
    // How many leading triangles each band has drawn without error
    let progress = targets.iter().map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();

    let (tris, failed, progress) = (&tris, &failed, &progress[..]);
    let mut outcomes = thread::scope(|s| {
        let handles = targets
            .into_iter()
            .enumerate()
            .map(|(b, band)| {
                s.spawn(move || {
                    let mut outcome = BandOutcome {
                        band,
                        marks: Vec::new(),
                        fragments: 0,
                        error: None,
                    };
                    for (i, tri) in tris.iter().enumerate() {
                        // Anything past the earliest failure gets rolled back anyway
                        if i > failed.load(Ordering::Relaxed) {
                            break;
                        }
                        outcome.marks.push((i, outcome.band.journal_len()));
                        match tri.rasterize::<V, S>(shader, &mut outcome.band) {
                            Ok(n) => outcome.fragments += n,
                            Err(err) => {
                                failed.fetch_min(i, Ordering::Relaxed);
                                outcome.error = Some((i, err));
                                break;
                            }
                        }
                        progress[b].store(i + 1, Ordering::Relaxed);

                        // No band can still fail on a triangle that every band has drawn
                        if outcome.marks.len() >= FORGET_INTERVAL {
                            let drawn = progress
                                .iter()
                                .map(|p| p.load(Ordering::Relaxed))
                                .min()
                                .unwrap_or(0);
                            outcome.forget_before(drawn);
                        }
                    }
                    outcome
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect::<Vec<_>>()
    });

    // A sequential draw stops at the earliest failing triangle, in its topmost failing row
    let mut first_error = None;
    for (b, outcome) in outcomes.iter_mut().enumerate() {
        if let Some((tri, err)) = outcome.error.take() {
            if first_error.as_ref().map_or(true, |(first, _, _)| tri < *first) {
                first_error = Some((tri, b, err));
            }
        }
    }

    let Some((tri, failing, err)) = first_error else {
        stats.fragments += outcomes.iter().map(|o| o.fragments).sum::<usize>();
        return match setup_error {
            Some(err) => Err(err),
            None => Ok(stats),
        };
    };
    // Bands above the failing one finished the failing triangle, bands below never reached it
    for (b, outcome) in outcomes.iter_mut().enumerate() {
        outcome.rollback(if b <= failing { tri + 1 } else { tri });
    }
    Err(err)
}

/// How many triangles a band draws between attempts to shrink its journal.
#[cfg(feature = "par")]
const FORGET_INTERVAL: usize = 256;
