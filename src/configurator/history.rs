//! Undo/redo stack of committed part maps.

use crate::parts::PartsMap;

#[derive(Debug, Clone, Default)]
pub struct History {
    states: Vec<PartsMap>,
    pointer: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.pointer = None;
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn current(&self) -> Option<&PartsMap> {
        self.pointer.and_then(|p| self.states.get(p))
    }

    /// Records a committed state. A state equal to the current one is
    /// ignored; anything after the pointer is discarded.
    pub fn push(&mut self, parts: &PartsMap) {
        if self.current() == Some(parts) {
            return;
        }

        let keep = self.pointer.map_or(0, |p| p + 1);
        self.states.truncate(keep);
        self.states.push(parts.clone());
        self.pointer = Some(self.states.len() - 1);
    }

    pub fn can_undo(&self) -> bool {
        self.pointer.is_some_and(|p| p > 0)
    }

    pub fn can_redo(&self) -> bool {
        match self.pointer {
            Some(p) => p + 1 < self.states.len(),
            None => false,
        }
    }

    pub fn undo(&mut self) -> Option<&PartsMap> {
        if !self.can_undo() {
            return None;
        }
        self.pointer = self.pointer.map(|p| p - 1);
        self.current()
    }

    pub fn undo_all(&mut self) -> Option<&PartsMap> {
        if !self.can_undo() {
            return None;
        }
        self.pointer = Some(0);
        self.current()
    }

    pub fn redo(&mut self) -> Option<&PartsMap> {
        if !self.can_redo() {
            return None;
        }
        self.pointer = self.pointer.map(|p| p + 1);
        self.current()
    }

    pub fn redo_all(&mut self) -> Option<&PartsMap> {
        if !self.can_redo() {
            return None;
        }
        self.pointer = Some(self.states.len() - 1);
        self.current()
    }
}
