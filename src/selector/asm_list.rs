use crate::basis::ShapeIdx;

const INITIAL_CAP: usize = 8;

/// A single assembly triplet: shape index, DOF number, and expansion coefficient
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AsmEntry<S> {
    pub idx: ShapeIdx,
    pub dof: usize,
    pub coef: S,
}

/// An ordered list of (shape-index, DOF, coefficient) triplets mapping local shape
/// functions to degrees of freedom. Storage grows by doubling and is retained across
/// [AsmList::clear] calls so a list can be reused between elements without reallocating
#[derive(Debug)]
pub struct AsmList<S> {
    entries: Vec<AsmEntry<S>>,
}

impl<S> AsmList<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Reset the live count to zero without releasing storage
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append a triplet, doubling the storage capacity if the list is full
    pub fn add_triplet(&mut self, idx: ShapeIdx, dof: usize, coef: S) {
        if self.entries.len() == self.entries.capacity() {
            self.enlarge();
        }
        self.entries.push(AsmEntry { idx, dof, coef });
    }

    fn enlarge(&mut self) {
        let new_cap = match self.entries.capacity() {
            0 => INITIAL_CAP,
            cap => cap * 2,
        };
        self.entries.reserve_exact(new_cap - self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn get(&self, n: usize) -> Option<&AsmEntry<S>> {
        self.entries.get(n)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AsmEntry<S>> {
        self.entries.iter()
    }
}

impl<S> Default for AsmList<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy of exactly the live entries; the copy's capacity is normalized to its count
impl<S: Clone> Clone for AsmList<S> {
    fn clone(&self) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len());
        entries.extend_from_slice(&self.entries);
        Self { entries }
    }
}
