/// A protocol fork identifier, governing the encoding rules of a batch's transaction stream.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::From,
    derive_more::Display,
)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ForkId(pub u64);

impl ForkId {
    /// The Dragonfruit fork, introducing the effective gas price percentage byte.
    pub const DRAGONFRUIT: Self = Self(5);
    /// The Incaberry fork.
    pub const INCABERRY: Self = Self(6);
    /// The Etrog fork, introducing L2 block markers in the transaction stream.
    pub const ETROG: Self = Self(7);
    /// The first Elderberry fork.
    pub const ELDERBERRY: Self = Self(8);

    /// Returns the inner value of the fork id.
    pub const fn id(&self) -> u64 {
        self.0
    }

    /// Returns true if transactions carry an effective gas price percentage byte.
    pub const fn has_effective_percentage(&self) -> bool {
        self.0 >= Self::DRAGONFRUIT.0
    }

    /// Returns true if the transaction stream is encoded as a sequence of L2 blocks.
    pub const fn is_etrog_or_later(&self) -> bool {
        self.0 >= Self::ETROG.0
    }
}

/// The range of batches governed by a fork.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ForkIdInterval {
    /// The fork id.
    pub fork_id: ForkId,
    /// The first batch of the fork.
    pub from_batch_number: u64,
    /// The last batch of the fork, [`u64::MAX`] for the active fork.
    pub to_batch_number: u64,
    /// The human readable version of the fork.
    pub version: String,
}

impl ForkIdInterval {
    /// Returns true if the interval covers the provided batch number.
    pub const fn contains(&self, batch_number: u64) -> bool {
        self.from_batch_number <= batch_number && batch_number <= self.to_batch_number
    }
}

#[cfg(test)]
mod tests {
    use super::{ForkId, ForkIdInterval};

    #[test]
    fn test_fork_id_boundaries() {
        assert!(!ForkId(4).has_effective_percentage());
        assert!(ForkId::DRAGONFRUIT.has_effective_percentage());
        assert!(!ForkId::INCABERRY.is_etrog_or_later());
        assert!(ForkId::ETROG.is_etrog_or_later());
        assert!(ForkId::ELDERBERRY.is_etrog_or_later());
        assert_eq!(ForkId::from(9u64).to_string(), "9");
    }

    #[test]
    fn test_fork_interval_contains() {
        let interval = ForkIdInterval {
            fork_id: ForkId::ETROG,
            from_batch_number: 10,
            to_batch_number: 20,
            version: "v7".to_string(),
        };
        assert!(!interval.contains(9));
        assert!(interval.contains(10));
        assert!(interval.contains(20));
        assert!(!interval.contains(21));
    }
}
