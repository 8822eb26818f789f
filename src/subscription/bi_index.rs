use std::collections::HashMap;
use std::hash::Hash;

/// Why a [`BiIndex::insert`] was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict<L, R> {
    /// The left key is already bound to this right key
    Left(R),
    /// The right key is already bound to this left key
    Right(L),
}

/// One-to-one mapping with O(1) lookup from either side.
///
/// Every mutator updates both directions or neither.
#[derive(Debug, Clone)]
pub struct BiIndex<L, R> {
    forward: HashMap<L, R>,
    backward: HashMap<R, L>,
}

impl<L, R> Default for BiIndex<L, R> {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }
}

impl<L, R> BiIndex<L, R>
where
    L: Eq + Hash + Clone,
    R: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        left: L,
        right: R,
    ) -> Result<(), Conflict<L, R>> {
        if let Some(existing) = self.forward.get(&left) {
            return Err(Conflict::Left(existing.clone()));
        }
        if let Some(existing) = self.backward.get(&right) {
            return Err(Conflict::Right(existing.clone()));
        }
        self.forward.insert(left.clone(), right.clone());
        self.backward.insert(right, left);
        Ok(())
    }

    pub fn get_by_left(
        &self,
        left: &L,
    ) -> Option<&R> {
        self.forward.get(left)
    }

    pub fn get_by_right(
        &self,
        right: &R,
    ) -> Option<&L> {
        self.backward.get(right)
    }

    pub fn contains_left(
        &self,
        left: &L,
    ) -> bool {
        self.forward.contains_key(left)
    }

    pub fn contains_right(
        &self,
        right: &R,
    ) -> bool {
        self.backward.contains_key(right)
    }

    pub fn remove_by_left(
        &mut self,
        left: &L,
    ) -> Option<R> {
        let right = self.forward.remove(left)?;
        self.backward.remove(&right);
        Some(right)
    }

    pub fn remove_by_right(
        &mut self,
        right: &R,
    ) -> Option<L> {
        let left = self.backward.remove(right)?;
        self.forward.remove(&left);
        Some(left)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
    }
}
