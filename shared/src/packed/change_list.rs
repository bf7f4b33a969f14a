/// Fixed-capacity list of changed property indices produced by a diff.
/// Pushing past capacity is refused rather than growing the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeList {
    indices: Vec<u32>,
    capacity: usize,
}

impl ChangeList {
    pub fn new(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.indices.len() >= self.capacity
    }

    pub fn contains(&self, index: u32) -> bool {
        self.indices.contains(&index)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Appends `index`, returning false if the list is already full
    pub fn push(&mut self, index: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.indices.push(index);
        true
    }

    /// Appends every index of `other` not already present, in `other`'s
    /// order. Existing entries keep their positions. Returns false if the
    /// list filled up before all of `other` was considered.
    pub fn merge_unique(&mut self, other: &[u32]) -> bool {
        for index in other {
            if self.contains(*index) {
                continue;
            }
            if !self.push(*index) {
                return false;
            }
        }
        true
    }
}
