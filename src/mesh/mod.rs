//! Triangle mesh storage and topology queries.
//!
//! The pipeline works on a plain indexed representation: a [`TriMesh`] holds
//! positions and triangles, and topology is answered by separate tables built
//! from the face list:
//!
//! - [`TriangleAdjacency`]: face across each edge and the inverse edge index
//! - [`VertexFaces`]: faces (and corners) around each vertex
//! - [`EdgeTopology`]: unique undirected edges with left/right faces
//! - [`HalfEdgeCursor`]: a value-type cursor for walking vertex fans
//!
//! Geometry helpers (normals, tangent frames, gradients, angle defects) live
//! in [`geometry`].

pub mod adjacency;
pub mod cursor;
pub mod geometry;
mod trimesh;

#[cfg(test)]
pub(crate) mod fixtures;

pub use adjacency::{EdgeTopology, TriangleAdjacency, VertexFaces};
pub use cursor::HalfEdgeCursor;
pub use geometry::LocalFrame;
pub use trimesh::TriMesh;
