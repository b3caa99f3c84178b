use std::{fmt::{self, Display, Formatter}, ops::Deref, str::FromStr};

use serde::{Serialize, Deserialize};

/// Dense, locus-scoped index of an allele within its locus registry (see [`crate::LocusInfo`]).
///
/// Allele identifiers are resolved to keys once, by the registry. Everything downstream only
/// ever manipulates keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlleleKey(pub usize);

impl AlleleKey {
    #[must_use]
    pub fn into_inner(self) -> usize {
        self.0
    }
}

impl From<usize> for AlleleKey {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl From<AlleleKey> for usize {
    fn from(value: AlleleKey) -> Self {
        value.0
    }
}

impl Deref for AlleleKey {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for AlleleKey {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<usize>().map(Self)
    }
}

impl Display for AlleleKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{:_>4}", AlleleKey(12)), "__12");
    }

    #[test]
    fn from_str() {
        assert_eq!(" 7".parse::<AlleleKey>(), Ok(AlleleKey(7)));
        assert!("-1".parse::<AlleleKey>().is_err());
    }

    #[test]
    fn ordering() {
        let mut keys = vec![AlleleKey(3), AlleleKey(0), AlleleKey(2)];
        keys.sort();
        assert_eq!(keys, vec![AlleleKey(0), AlleleKey(2), AlleleKey(3)]);
        assert_eq!(*keys[2], 3);
    }
}
