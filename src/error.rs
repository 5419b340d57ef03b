/// Convenience result type used across the renderer.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors reported by surfaces, meshes and the shader interpolation mechanism.
///
/// Out-of-bounds pixel access and degenerate geometry are not errors. Reads outside a surface return sentinels,
/// writes outside it are ignored and triangles that cannot be projected are skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A surface was created or resized with a zero dimension.
    #[error("surface dimensions must be larger than 0 (given was {width}x{height})")]
    InvalidDimensions { width: usize, height: usize },

    /// A caller-supplied buffer does not hold exactly `width * height` elements.
    #[error("buffer holds {found} elements but the surface needs {expected}")]
    BufferSizeMismatch { expected: usize, found: usize },

    /// A mesh element references a vertex that does not exist.
    #[error("invalid mesh index {index} (mesh has {vertex_count} vertices)")]
    InvalidMeshIndex { index: u32, vertex_count: usize },

    /// `interpolate` or `flat` was called without a triangle being rasterized.
    #[error("varyings can only be read from a fragment stage invoked by the rasterizer")]
    NoActiveContext,

    /// The vertex output does not register a varying with the given name.
    #[error("`{name}` is not a varying of this shader")]
    UnknownVarying { name: String },

    /// The varying exists but holds a different kind of value than the one requested.
    #[error("varying `{name}` holds a {found}, not a {expected}")]
    VaryingTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl RenderError {
    pub(crate) fn unknown_varying(name: impl Into<String>) -> Self {
        Self::UnknownVarying { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = RenderError::InvalidDimensions {
            width: 0,
            height: 4,
        };
        assert_eq!(
            err.to_string(),
            "surface dimensions must be larger than 0 (given was 0x4)"
        );

        let err = RenderError::InvalidMeshIndex {
            index: 7,
            vertex_count: 3,
        };
        assert!(err.to_string().contains("7"));

        let err = RenderError::unknown_varying("uv");
        assert_eq!(err, RenderError::UnknownVarying { name: "uv".into() });
    }
}
