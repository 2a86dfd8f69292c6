/// One of the 4 directions of a cartesian 2d grid.
///
/// Directions are listed in neighbour enumeration order: left, right, down, up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    XBackward = 0,
    XForward = 1,
    YBackward = 2,
    YForward = 3,
}

impl Direction {
    /// Returns the unit [`GridDelta`] for this direction
    #[inline]
    pub fn delta(&self) -> &'static GridDelta {
        &CARTESIAN_2D_DELTAS[*self as usize]
    }
}

/// Offset between two positions of a grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDelta {
    pub(crate) dx: i32,
    pub(crate) dy: i32,
}

pub const CARTESIAN_2D_DIRECTIONS: &[Direction] = &[
    Direction::XBackward,
    Direction::XForward,
    Direction::YBackward,
    Direction::YForward,
];

pub const CARTESIAN_2D_DELTAS: &[GridDelta] = &[
    // XBackward
    GridDelta { dx: -1, dy: 0 },
    // XForward
    GridDelta { dx: 1, dy: 0 },
    // YBackward
    GridDelta { dx: 0, dy: -1 },
    // YForward
    GridDelta { dx: 0, dy: 1 },
];

#[cfg(test)]
mod tests {
    use super::CARTESIAN_2D_DIRECTIONS;

    #[test]
    fn deltas_are_distinct_unit_steps() {
        for (index, dir) in CARTESIAN_2D_DIRECTIONS.iter().enumerate() {
            let delta = dir.delta();
            assert_eq!(delta.dx.abs() + delta.dy.abs(), 1);
            for other in &CARTESIAN_2D_DIRECTIONS[index + 1..] {
                assert_ne!(delta, other.delta());
            }
        }
    }
}
