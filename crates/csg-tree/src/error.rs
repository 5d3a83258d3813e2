//! Error types for CSG evaluation.

use std::fmt;

use thiserror::Error;

/// Which arena of a mesh ran out of index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshElement {
    Vertices,
    Edges,
    Polygons,
    Planes,
}

impl fmt::Display for MeshElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeshElement::Vertices => "vertices",
            MeshElement::Edges => "edges",
            MeshElement::Polygons => "polygons",
            MeshElement::Planes => "planes",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while evaluating a CSG tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsgError {
    /// A single mesh would exceed the fixed 16-bit index space. Reported
    /// rather than truncated: truncation would silently corrupt the output.
    /// Callers must pre-partition geometry that would exceed the cap.
    #[error("mesh capacity exceeded: more than 65535 {0}")]
    MeshCapacity(MeshElement),

    /// Evaluation was requested on a tree without a root.
    #[error("no tree loaded")]
    NoTreeLoaded,
}

/// Result type for CSG evaluation.
pub type Result<T> = std::result::Result<T, CsgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            CsgError::MeshCapacity(MeshElement::Edges).to_string(),
            "mesh capacity exceeded: more than 65535 edges"
        );
        assert_eq!(CsgError::NoTreeLoaded.to_string(), "no tree loaded");
    }
}
