//! Half-edge cursor over a face/adjacency representation.
//!
//! A cursor names a face, one of its edges and one endpoint of that edge.
//! All moves return a new cursor, so several cursors can walk the same mesh
//! without sharing state.

use super::TriangleAdjacency;

/// Position on a triangle mesh: face, local edge, and which endpoint of the
/// edge is the current vertex.
///
/// With `reverse == false` the current vertex is corner `edge` of the face
/// (the start of the edge), otherwise corner `(edge + 1) % 3` (its end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalfEdgeCursor {
    /// Current face.
    pub face: usize,
    /// Local edge index in `0..3`.
    pub edge: usize,
    /// Whether the current vertex is the end of the edge.
    pub reverse: bool,
}

impl HalfEdgeCursor {
    /// Cursor on vertex `corner` of `face`, sitting on the edge that leaves it.
    #[inline]
    pub fn at_corner(face: usize, corner: usize) -> Self {
        Self {
            face,
            edge: corner,
            reverse: false,
        }
    }

    /// Local corner of the current vertex.
    #[inline]
    pub fn corner(&self) -> usize {
        if self.reverse {
            (self.edge + 1) % 3
        } else {
            self.edge
        }
    }

    /// Current vertex.
    #[inline]
    pub fn vertex(&self, faces: &[[usize; 3]]) -> usize {
        faces[self.face][self.corner()]
    }

    /// Whether the current edge lies on the mesh boundary.
    #[inline]
    pub fn is_border(&self, adjacency: &TriangleAdjacency) -> bool {
        adjacency.is_boundary_edge(self.face, self.edge)
    }

    /// Cross the current edge into the neighboring face, keeping the vertex.
    ///
    /// On a boundary edge the cursor is returned unchanged.
    #[inline]
    pub fn flip_face(self, adjacency: &TriangleAdjacency) -> Self {
        match adjacency.across(self.face, self.edge) {
            Some((g, j)) => Self {
                face: g,
                edge: j,
                reverse: !self.reverse,
            },
            None => self,
        }
    }

    /// Switch to the other edge of the face that contains the current vertex.
    #[inline]
    pub fn flip_edge(self) -> Self {
        let edge = if self.reverse {
            (self.edge + 1) % 3
        } else {
            (self.edge + 2) % 3
        };
        Self {
            face: self.face,
            edge,
            reverse: !self.reverse,
        }
    }

    /// Move to the other endpoint of the current edge.
    #[inline]
    pub fn flip_vertex(self) -> Self {
        Self {
            reverse: !self.reverse,
            ..self
        }
    }

    /// Rotate to the next face around the current vertex.
    ///
    /// On a boundary edge the cursor jumps back across the whole fan to the
    /// face at the opposite boundary, so repeated calls cycle through every
    /// face of the fan.
    pub fn next_fan_edge(self, adjacency: &TriangleAdjacency) -> Self {
        if self.is_border(adjacency) {
            let mut cursor = self.flip_edge();
            // Bounded by the fan size; guards against inconsistent tables.
            let mut steps = 0;
            while !cursor.is_border(adjacency) && steps <= 3 * adjacency.num_faces() {
                cursor = cursor.flip_face(adjacency).flip_edge();
                steps += 1;
            }
            cursor.flip_edge()
        } else {
            self.flip_face(adjacency).flip_edge()
        }
    }
}
