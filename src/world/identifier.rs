use std::fmt;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while generating identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The sequential generator ran out of identifier space. This is a
    /// process-level invariant violation; the generator must be reset before
    /// it can produce new identifiers.
    #[error("Sequential identifier space exhausted. Generator must be reset before producing new identifiers")]
    SpaceExhausted,
}

/// Opaque, comparable value uniquely naming an entity or a component within
/// one [`Manager`](crate::Manager) instance.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Identifier(u64);

impl Identifier {
    pub fn from_u64(value: u64) -> Self {
        Identifier(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

/// The set of identifiers currently bound to a live entity or component.
/// Implemented by [`Manager`](crate::Manager); generators consult it so a
/// value is never handed out while still in use.
pub trait IdentifierSpace {
    fn contains_identifier(&self, identifier: Identifier) -> bool;
}

/// Produces identifiers under a chosen strategy.
///
/// `next` returns a value distinct from everything previously returned by
/// this generator instance and from everything currently bound in `space`.
/// `last` returns the most recently generated value, if any.
pub trait IdentifierGenerator {
    fn next(&mut self, space: &dyn IdentifierSpace) -> Result<Identifier, IdentifierError>;
    fn last(&self) -> Option<Identifier>;
}

/// Monotonically increasing counter strategy. Values are reused only after
/// [`reset`](SequentialGenerator::reset); values already bound in the target
/// space are skipped over so explicit and generated identifiers can mix.
pub struct SequentialGenerator {
    next_value: u64,
    last: Option<Identifier>,
}

impl SequentialGenerator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start counting from `value`. Useful when identifiers were merged in
    /// from another source with a known upper bound.
    pub fn starting_at(value: u64) -> Self {
        Self {
            next_value: value,
            last: None,
        }
    }

    /// Restart the counter. The only path through which previously generated
    /// identifiers may be produced again.
    pub fn reset(&mut self) {
        self.next_value = 0;
        self.last = None;
    }
}

impl Default for SequentialGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierGenerator for SequentialGenerator {
    fn next(&mut self, space: &dyn IdentifierSpace) -> Result<Identifier, IdentifierError> {
        loop {
            let candidate = Identifier(self.next_value);
            self.next_value = self
                .next_value
                .checked_add(1)
                .ok_or(IdentifierError::SpaceExhausted)?;
            if !space.contains_identifier(candidate) {
                self.last = Some(candidate);
                return Ok(candidate);
            }
        }
    }

    fn last(&self) -> Option<Identifier> {
        self.last
    }
}

/// Collision-checked random token strategy. Retries internally until an
/// unused value is drawn, so it stays valid even when entities are created
/// out of process or merged from another source. Never surfaces a failure
/// under normal entropy.
pub struct RandomGenerator {
    rng: StdRng,
    last: Option<Identifier>,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            last: None,
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierGenerator for RandomGenerator {
    fn next(&mut self, space: &dyn IdentifierSpace) -> Result<Identifier, IdentifierError> {
        loop {
            let candidate = Identifier(self.rng.gen());
            if !space.contains_identifier(candidate) {
                self.last = Some(candidate);
                return Ok(candidate);
            }
        }
    }

    fn last(&self) -> Option<Identifier> {
        self.last
    }
}
