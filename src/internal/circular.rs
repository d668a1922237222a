//! Cycle detection during resolution.

use crate::error::{IncantError, IncantResult};
use crate::key::CallableId;

/// Default bound on resolution depth.
pub(crate) const MAX_DEPTH: usize = 1024;

/// Stack of callables currently being resolved.
///
/// A callable that is entered while already on the stack closes a cycle;
/// the error carries the whole path, ending with the repeated name.
pub(crate) struct ResolutionStack {
    frames: Vec<(CallableId, String)>,
    max_depth: usize,
}

impl ResolutionStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        ResolutionStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub(crate) fn enter(&mut self, id: CallableId, name: &str) -> IncantResult<()> {
        // Circular detection BEFORE pushing the new frame
        if self.frames.iter().any(|(frame, _)| *frame == id) {
            let mut path: Vec<String> = self.frames.iter().map(|(_, n)| n.clone()).collect();
            path.push(name.to_string());
            return Err(IncantError::Circular(path));
        }

        if self.frames.len() >= self.max_depth {
            return Err(IncantError::DepthExceeded(self.frames.len()));
        }

        self.frames.push((id, name.to_string()));
        Ok(())
    }

    pub(crate) fn leave(&mut self, id: CallableId) {
        if let Some((last, _)) = self.frames.pop() {
            debug_assert_eq!(last, id);
        }
    }

    pub(crate) fn contains(&self, id: CallableId) -> bool {
        self.frames.iter().any(|(frame, _)| *frame == id)
    }
}
