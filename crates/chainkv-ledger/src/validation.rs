/// What a validation pass found wrong at one height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Stored hash differs from the hash recomputed from the block's fields.
    HashMismatch,
    /// The block's hash differs from the next block's `previousBlockHash`.
    BrokenLink,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashMismatch => write!(f, "hash mismatch"),
            Self::BrokenLink => write!(f, "broken link"),
        }
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub height: u64,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn hash_mismatch(height: u64) -> Self {
        Self {
            height,
            kind: ViolationKind::HashMismatch,
        }
    }

    pub fn broken_link(height: u64) -> Self {
        Self {
            height,
            kind: ViolationKind::BrokenLink,
        }
    }
}

/// Result of a full chain validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    /// Height the chain had when validation ran (-1 for an empty ledger).
    pub height: i64,
    /// Every violation found, in discovery order.
    pub violations: Vec<Violation>,
}

impl ChainReport {
    pub fn new(height: i64) -> Self {
        Self {
            height,
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Returns `true` if no violations were found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Sorted, de-duplicated heights with at least one violation.
    pub fn faulty_heights(&self) -> Vec<u64> {
        let mut heights: Vec<u64> = self.violations.iter().map(|v| v.height).collect();
        heights.sort_unstable();
        heights.dedup();
        heights
    }

    /// `(valid, faulty heights)`.
    pub fn into_parts(self) -> (bool, Vec<u64>) {
        (self.is_valid(), self.faulty_heights())
    }
}
