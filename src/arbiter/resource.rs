// ABOUTME: Resource ring state and the Pair type naming two adjacent resources.
// ABOUTME: ResourceSet has no lock of its own; only the Arbiter mutates it.

use serde::Serialize;

use crate::agent::AgentId;
use crate::error::ArbiterError;

/// Two resources requested together.
///
/// For agent `i` in a ring of `n` the pair is `(i, (i + 1) % n)`, but the
/// arbiter accepts any two distinct in-range indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Pair {
    /// First resource of the pair.
    pub left: usize,
    /// Second resource of the pair.
    pub right: usize,
}

impl Pair {
    /// Create a pair from two resource indices.
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// The adjacent pair an agent needs in a ring of `size` resources.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn for_agent(agent: AgentId, size: usize) -> Self {
        assert!(size > 0, "ring size must be positive");
        let left = agent.index();
        Self::new(left, (left + 1) % size)
    }

    /// Both indices, left first.
    pub fn indices(&self) -> [usize; 2] {
        [self.left, self.right]
    }

    /// Whether this pair includes resource `index`.
    pub fn contains(&self, index: usize) -> bool {
        self.left == index || self.right == index
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.left, self.right)
    }
}

/// The ring of resources, each free or held by exactly one agent.
#[derive(Debug)]
pub(crate) struct ResourceSet {
    owners: Vec<Option<AgentId>>,
}

impl ResourceSet {
    pub(crate) fn new(size: usize) -> Result<Self, ArbiterError> {
        if size < 2 {
            return Err(ArbiterError::TooFewResources(size));
        }
        Ok(Self {
            owners: vec![None; size],
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }

    /// Reject out-of-range or repeated indices.
    pub(crate) fn check(&self, pair: Pair) -> Result<(), ArbiterError> {
        for index in pair.indices() {
            self.check_index(index)?;
        }
        if pair.left == pair.right {
            return Err(ArbiterError::DegeneratePair(pair.left));
        }
        Ok(())
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<(), ArbiterError> {
        if index >= self.owners.len() {
            return Err(ArbiterError::IndexOutOfRange {
                index,
                size: self.owners.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn owner(&self, index: usize) -> Option<AgentId> {
        self.owners[index]
    }

    /// True when both resources of `pair` are free.
    pub(crate) fn is_free(&self, pair: Pair) -> bool {
        self.owners[pair.left].is_none() && self.owners[pair.right].is_none()
    }

    pub(crate) fn mark_held(&mut self, pair: Pair, agent: AgentId) {
        debug_assert!(self.is_free(pair));
        self.owners[pair.left] = Some(agent);
        self.owners[pair.right] = Some(agent);
    }

    pub(crate) fn mark_free(&mut self, pair: Pair) {
        self.owners[pair.left] = None;
        self.owners[pair.right] = None;
    }

    pub(crate) fn held(&self) -> usize {
        self.owners.iter().filter(|o| o.is_some()).count()
    }

    pub(crate) fn owners(&self) -> &[Option<AgentId>] {
        &self.owners
    }
}
