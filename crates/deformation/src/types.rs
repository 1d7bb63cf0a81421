//! Core identifiers and the recompute flag shared across components.

use serde::{Deserialize, Serialize};

/// Type-safe vertex identifier into the base grid.
///
/// Indices are stable for the lifetime of the mesh: the topology is never
/// edited after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Position of this vertex in per-vertex arrays
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for VertexId {
    fn from(index: usize) -> Self {
        VertexId(index as u32)
    }
}

/// Coalescing recompute flag.
///
/// Set by every mutation that affects deformed geometry and cleared only
/// after all backends were re-solved and every output mesh refreshed.
/// Multiple mutations between two ticks collapse into one recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlag {
    dirty: bool,
}

impl DirtyFlag {
    /// Request a recompute on the next tick.
    pub fn mark(&mut self) {
        self.dirty = true;
    }

    /// Whether a recompute is pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the pending recompute as done.
    pub fn clear(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id_roundtrip() {
        let id = VertexId::from(42usize);
        assert_eq!(id, VertexId(42));
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn test_dirty_flag_coalesces() {
        let mut flag = DirtyFlag::default();
        assert!(!flag.is_dirty());
        flag.mark();
        flag.mark();
        assert!(flag.is_dirty());
        flag.clear();
        assert!(!flag.is_dirty());
    }
}
