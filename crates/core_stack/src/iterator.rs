//! Sequence iterator over the items of a [`TabModel`].
//!
//! The iterator walks the visible sequence forward or backward from an
//! arbitrary start index and resolves the tag of every item on first visit.
//! Resolution of an item may depend on its predecessor in iteration order, so
//! resolving an item first resolves the missing part of its predecessor chain.
//! This is done with an explicit loop over a growable cache rather than by
//! recursion, which keeps large stacks safe.

use crate::model::{Item, TabModel, Tag};

/// Iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Increasing indices.
    #[default]
    Forward,
    /// Decreasing indices.
    Reverse,
}

/// Computes the tag of an item the first time it is visited.
///
/// Implementations must be idempotent and may only look at the predecessor in
/// iteration order, never at a successor.
pub trait Resolve {
    fn resolve(&mut self, model: &TabModel, index: usize, predecessor: Option<&Item>) -> Tag;
}

/// Resolver returning the tags currently stored in the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredTags;

impl Resolve for StoredTags {
    fn resolve(&mut self, model: &TabModel, index: usize, _predecessor: Option<&Item>) -> Tag {
        model.stored_tag(model.key_at(index))
    }
}

/// Lazily resolving, caching iterator over the visible sequence.
pub struct ItemIterator<'a, R = StoredTags> {
    model: &'a TabModel,
    resolver: R,
    direction: Direction,
    start: Option<usize>,
    cache: Vec<Option<Item>>,
    /// Index of the item returned by the latest call to `next`.
    current: Option<usize>,
    /// Index of the item returned before `current`.
    previous: Option<usize>,
    exhausted: bool,
}

impl<'a> ItemIterator<'a, StoredTags> {
    /// Iterate over the stored tags of the model.
    pub fn stored(model: &'a TabModel) -> Self {
        Self::new(model, StoredTags)
    }
}

impl<'a, R: Resolve> ItemIterator<'a, R> {
    /// Create a forward iterator starting at index 0.
    pub fn new(model: &'a TabModel, resolver: R) -> Self {
        Self {
            model,
            resolver,
            direction: Direction::Forward,
            start: None,
            cache: vec![None; model.count()],
            current: None,
            previous: None,
            exhausted: false,
        }
    }

    /// Iterate from the last index toward the first.
    pub fn reverse(mut self) -> Self {
        self.direction = Direction::Reverse;
        self
    }

    /// Begin at `index` instead of the first index of the iteration order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `[0, count)`.
    pub fn start(mut self, index: usize) -> Self {
        self.check_index(index);
        self.start = Some(index);
        self
    }

    /// Number of items in the sequence.
    pub fn item_count(&self) -> usize {
        self.cache.len()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn model(&self) -> &'a TabModel {
        self.model
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.cache.len(),
            "item index {} out of bounds (count: {})",
            index,
            self.cache.len()
        );
        assert_eq!(
            self.cache.len(),
            self.model.count(),
            "iterator cache does not match the model"
        );
    }

    fn start_index(&self) -> Option<usize> {
        if self.cache.is_empty() {
            return None;
        }
        Some(self.start.unwrap_or(match self.direction {
            Direction::Forward => 0,
            Direction::Reverse => self.cache.len() - 1,
        }))
    }

    fn step(&self, index: usize) -> Option<usize> {
        match self.direction {
            Direction::Forward => Some(index + 1).filter(|next| *next < self.cache.len()),
            Direction::Reverse => index.checked_sub(1),
        }
    }

    /// Predecessor of `index` in iteration order. The start item has none, and
    /// neither has an item that lies outside the iterated range.
    fn predecessor_index(&self, index: usize) -> Option<usize> {
        let start = self.start_index()?;
        match self.direction {
            Direction::Forward if index > start => Some(index - 1),
            Direction::Reverse if index < start => Some(index + 1),
            _ => None,
        }
    }

    /// The item at `index`, resolving it and its missing predecessors if needed.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `[0, count)`.
    pub fn item_at(&mut self, index: usize) -> Item {
        self.check_index(index);
        if let Some(item) = self.cache[index] {
            return item;
        }

        let mut chain = vec![index];
        let mut cursor = index;
        while let Some(predecessor) = self.predecessor_index(cursor) {
            if self.cache[predecessor].is_some() {
                break;
            }
            chain.push(predecessor);
            cursor = predecessor;
        }

        for &pending in chain.iter().rev() {
            let predecessor = self
                .predecessor_index(pending)
                .and_then(|predecessor| self.cache[predecessor]);
            let tag = self
                .resolver
                .resolve(self.model, pending, predecessor.as_ref());
            self.cache[pending] = Some(Item {
                index: pending,
                key: self.model.key_at(pending),
                tag,
            });
        }

        self.cache[index].unwrap_or_else(|| unreachable!("item {} was just resolved", index))
    }

    /// The item that the next call to `next` returns, without advancing.
    pub fn peek(&mut self) -> Option<Item> {
        let index = self.next_index()?;
        Some(self.item_at(index))
    }

    /// The item returned before the current one.
    pub fn previous(&self) -> Option<Item> {
        self.previous.and_then(|index| self.cache[index])
    }

    /// The first item of this iteration.
    pub fn first(&mut self) -> Option<Item> {
        let index = self.start_index()?;
        Some(self.item_at(index))
    }

    /// Replace the cached tag of an item, so that successors resolved later see
    /// the updated value.
    pub fn update(&mut self, item: Item) {
        self.check_index(item.index);
        self.cache[item.index] = Some(item);
    }

    /// All resolved items in index order.
    pub fn into_resolved(self) -> Vec<Item> {
        self.cache.into_iter().flatten().collect()
    }

    fn next_index(&self) -> Option<usize> {
        if self.exhausted {
            return None;
        }
        match self.current {
            None => self.start_index(),
            Some(current) => self.step(current),
        }
    }
}

impl<R: Resolve> Iterator for ItemIterator<'_, R> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let Some(index) = self.next_index() else {
            self.exhausted = true;
            return None;
        };
        self.previous = self.current;
        self.current = Some(index);
        Some(self.item_at(index))
    }
}
