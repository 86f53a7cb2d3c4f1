use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A compass approach to the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// One of the two signal groups sharing right-of-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ApproachGroup {
    NS,
    EW,
}

impl Direction {
    /// All four approaches, in the fixed scan order used throughout the crate.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The signal group this approach belongs to.
    pub fn group(self) -> ApproachGroup {
        match self {
            Direction::North | Direction::South => ApproachGroup::NS,
            Direction::East | Direction::West => ApproachGroup::EW,
        }
    }

    /// A stable index into per-direction tables.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }
}

impl ApproachGroup {
    /// The group that conflicts with this one.
    pub fn opposite(self) -> ApproachGroup {
        match self {
            ApproachGroup::NS => ApproachGroup::EW,
            ApproachGroup::EW => ApproachGroup::NS,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ApproachGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApproachGroup::NS => "NS",
            ApproachGroup::EW => "EW",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grouping_is_exhaustive() {
        assert_eq!(Direction::North.group(), ApproachGroup::NS);
        assert_eq!(Direction::South.group(), ApproachGroup::NS);
        assert_eq!(Direction::East.group(), ApproachGroup::EW);
        assert_eq!(Direction::West.group(), ApproachGroup::EW);
    }

    #[test]
    fn indices_are_distinct() {
        let mut seen = [false; 4];
        for dir in Direction::ALL {
            assert!(!seen[dir.index()]);
            seen[dir.index()] = true;
        }
    }

    #[test]
    fn opposite_is_an_involution() {
        assert_eq!(ApproachGroup::NS.opposite(), ApproachGroup::EW);
        assert_eq!(ApproachGroup::EW.opposite().opposite(), ApproachGroup::EW);
    }
}
