use crate::error::{RenderError, RenderResult};

/// A triangle mesh: a list of vertices and a list of triangles indexing into it.
///
/// The vertex type is entirely up to the application. It is handed, unmodified, to the vertex stage of whichever
/// [`Shader`](crate::Shader) draws the mesh.
#[derive(Debug)]
pub struct Mesh<V> {
    vertices: Vec<V>,
    elements: Vec<[u32; 3]>,
}

impl<V> Default for Mesh<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Mesh<V> {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn with_capacity(vertices: usize, elements: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            elements: Vec::with_capacity(elements),
        }
    }

    /// Append a vertex, returning the index that elements should use to refer to it.
    ///
    /// # Panics
    ///
    /// Panics if the mesh already holds as many vertices as a `u32` index can address.
    pub fn add_vertex(&mut self, vertex: V) -> u32 {
        let idx = next_index(self.vertices.len());
        self.vertices.push(vertex);
        idx
    }

    /// Append a triangle made of three vertex indices.
    ///
    /// The indices are not validated here. Drawing a mesh containing an index without a corresponding vertex fails
    /// with [`RenderError::InvalidMeshIndex`].
    pub fn add_element(&mut self, a: u32, b: u32, c: u32) {
        self.elements.push([a, b, c]);
    }

    #[inline]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    #[inline]
    pub fn elements(&self) -> &[[u32; 3]] {
        &self.elements
    }

    /// The number of triangles in the mesh.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the triangles of the mesh, resolving each index to its vertex.
    pub fn triangles(&self) -> impl Iterator<Item = RenderResult<[&V; 3]>> + '_ {
        self.elements.iter().map(move |&[a, b, c]| {
            Ok([self.vertex(a)?, self.vertex(b)?, self.vertex(c)?])
        })
    }

    fn vertex(&self, index: u32) -> RenderResult<&V> {
        self.vertices
            .get(index as usize)
            .ok_or(RenderError::InvalidMeshIndex {
                index,
                vertex_count: self.vertices.len(),
            })
    }
}

fn next_index(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(idx) => idx,
        Err(_) => panic!("a mesh cannot hold more than {} vertices", u64::from(u32::MAX) + 1),
    }
}
