use std::{fmt, ops::Range};

use self::direction::{Direction, GridDelta, CARTESIAN_2D_DIRECTIONS};

/// Defines directions and neighbour offsets
pub mod direction;

/// Index of a Node
pub type NodeIndex = usize;

/// Represents a position in a grid in a practical format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPosition {
    /// Position on the x axis
    pub x: u32,
    /// Position on the y axis
    pub y: u32,
}

impl GridPosition {
    pub fn new(x: u32, y: u32) -> GridPosition {
        Self { x, y }
    }

    fn get_delta_position(&self, delta: &GridDelta) -> (i64, i64) {
        (
            i64::from(self.x) + i64::from(delta.dx),
            i64::from(self.y) + i64::from(delta.dy),
        )
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Definition of a fixed size 2d cartesian grid. Coordinates do not loop: cells on the borders simply have less neighbours.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridDefinition {
    size_x: u32,
    size_y: u32,
}

impl fmt::Display for GridDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( size: {} {} )", self.size_x, self.size_y)
    }
}

impl GridDefinition {
    /// Creates a new [`GridDefinition`]
    ///
    /// Sizes are checked when building a [`crate::generator::Generator`], not here.
    pub fn new(size_x: u32, size_y: u32) -> GridDefinition {
        Self { size_x, size_y }
    }

    /// Creates a new square [`GridDefinition`]
    pub fn new_square(size: u32) -> GridDefinition {
        Self::new(size, size)
    }

    /// Returns the size of the grid in the X axis.
    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    /// Returns the size of the grid in the Y axis.
    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    /// Returns the total size of the grid
    pub fn total_size(&self) -> usize {
        self.size_x as usize * self.size_y as usize
    }

    /// Returns a [`Range`] over all node indexes in this grid
    pub fn indexes(&self) -> Range<NodeIndex> {
        0..self.total_size()
    }

    /// Returns the position of the center node (rounded down on even sizes)
    pub fn center(&self) -> GridPosition {
        GridPosition::new(self.size_x / 2, self.size_y / 2)
    }

    /// Returns `true` if the position is inside the grid
    pub fn contains(&self, grid_position: &GridPosition) -> bool {
        grid_position.x < self.size_x && grid_position.y < self.size_y
    }

    /// Returns the index from a grid position.
    ///
    /// NO CHECK is done to verify that the given position is a valid position for this grid.
    #[inline]
    pub fn get_index(&self, x: u32, y: u32) -> NodeIndex {
        x as usize + y as usize * self.size_x as usize
    }

    /// Returns the index from a grid position.
    ///
    /// NO CHECK is done to verify that the given position is a valid position for this grid.
    #[inline]
    pub fn get_index_from_pos(&self, grid_position: &GridPosition) -> NodeIndex {
        self.get_index(grid_position.x, grid_position.y)
    }

    /// Returns a [`GridPosition`] from the index of a node in this [`GridDefinition`].
    ///
    /// NO CHECK is done to verify that the given index is a valid index for this grid.
    pub fn get_position(&self, grid_index: NodeIndex) -> GridPosition {
        let size_x = self.size_x as usize;
        GridPosition {
            x: (grid_index % size_x) as u32,
            y: (grid_index / size_x) as u32,
        }
    }

    /// Returns the next position in the grid when moving `delta` unit(s) from `grid_position`.
    ///
    /// Returns `None` if the destination is not in the grid.
    pub fn get_next_pos(
        &self,
        grid_position: &GridPosition,
        delta: &GridDelta,
    ) -> Option<GridPosition> {
        let (x, y) = grid_position.get_delta_position(delta);
        if x < 0 || y < 0 || x >= i64::from(self.size_x) || y >= i64::from(self.size_y) {
            return None;
        }
        Some(GridPosition::new(x as u32, y as u32))
    }

    /// Returns the index of the next position in the grid when moving 1 unit in `direction` from `grid_position`.
    ///
    /// Returns `None` if the destination is not in the grid.
    pub fn get_next_index(
        &self,
        grid_position: &GridPosition,
        direction: Direction,
    ) -> Option<NodeIndex> {
        self.get_next_pos(grid_position, direction.delta())
            .map(|next_pos| self.get_index_from_pos(&next_pos))
    }

    /// Returns an iterator over the indexes of the in-bounds neighbours of `node_index`, in [`CARTESIAN_2D_DIRECTIONS`] order.
    pub fn neighbours(&self, node_index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        let position = self.get_position(node_index);
        CARTESIAN_2D_DIRECTIONS
            .iter()
            .filter_map(move |&dir| self.get_next_index(&position, dir))
    }

    #[inline]
    pub(crate) fn directions(&self) -> &'static [Direction] {
        CARTESIAN_2D_DIRECTIONS
    }

    /// Creates a [`GridData`] with the size of the [`GridDefinition`] with each element value being a copy of the given one.
    pub fn new_grid_data<D: Clone>(&self, element: D) -> GridData<D> {
        GridData {
            grid: self.clone(),
            data: vec![element; self.total_size()],
        }
    }
}

/// Holds a [`GridDefinition`] and generic data in a linear buffer that can be accessed through the grid definition to represent the grid content.
///
/// A finalized terrain is a `GridData<TerrainIndex>`, see [`crate::generator::Generator::to_grid_data`].
#[derive(Clone, Debug, PartialEq)]
pub struct GridData<D> {
    grid: GridDefinition,
    data: Vec<D>,
}

impl<D> GridData<D> {
    /// `data` is expected to hold one element per node of `grid`, see also [`GridDefinition::new_grid_data`].
    pub fn new(grid: GridDefinition, data: Vec<D>) -> Self {
        Self { grid, data }
    }

    /// Returns a reference to the `GridDefinition` this is based on
    pub fn grid(&self) -> &GridDefinition {
        &self.grid
    }

    /// Sets the value of the element at `index` in the grid.
    ///
    /// NO CHECK is done to verify that the given index is a valid index for this grid.
    pub fn set(&mut self, index: NodeIndex, value: D) {
        self.data[index] = value;
    }

    /// Returns a reference to the element at this index.
    ///
    /// NO CHECK is done to verify that the given index is a valid index for this grid.
    pub fn get(&self, index: NodeIndex) -> &D {
        &self.data[index]
    }

    /// Returns a reference to the element at this position.
    ///
    /// NO CHECK is done to verify that the given position is a valid position for this grid.
    pub fn get_2d(&self, x: u32, y: u32) -> &D {
        &self.data[self.grid.get_index(x, y)]
    }

    /// Returns a reference to the undelying data buffer.
    pub fn nodes(&self) -> &[D] {
        &self.data
    }
}

/// Reference to a node, either by index or by position
#[derive(Clone, Copy, Debug)]
pub enum NodeRef {
    Index(NodeIndex),
    Pos(GridPosition),
}

impl NodeRef {
    pub fn to_index(&self, grid: &GridDefinition) -> NodeIndex {
        match self {
            NodeRef::Index(index) => *index,
            NodeRef::Pos(pos) => grid.get_index_from_pos(pos),
        }
    }
}

impl From<NodeIndex> for NodeRef {
    fn from(index: NodeIndex) -> Self {
        NodeRef::Index(index)
    }
}

impl From<GridPosition> for NodeRef {
    fn from(position: GridPosition) -> Self {
        NodeRef::Pos(position)
    }
}

#[cfg(test)]
mod tests {
    use super::{GridDefinition, GridPosition};

    #[test]
    fn index_and_position_are_consistent() {
        let grid = GridDefinition::new(4, 3);
        for index in grid.indexes() {
            let pos = grid.get_position(index);
            assert!(grid.contains(&pos));
            assert_eq!(grid.get_index_from_pos(&pos), index);
        }
        assert_eq!(grid.get_position(5), GridPosition::new(1, 1));
    }

    #[test]
    fn neighbours_do_not_wrap() {
        let grid = GridDefinition::new_square(3);

        let corner: Vec<_> = grid.neighbours(grid.get_index(0, 0)).collect();
        assert_eq!(corner, vec![grid.get_index(1, 0), grid.get_index(0, 1)]);

        let center: Vec<_> = grid.neighbours(grid.get_index(1, 1)).collect();
        assert_eq!(
            center,
            vec![
                grid.get_index(0, 1),
                grid.get_index(2, 1),
                grid.get_index(1, 0),
                grid.get_index(1, 2)
            ]
        );

        let edge: Vec<_> = grid.neighbours(grid.get_index(2, 1)).collect();
        assert_eq!(edge.len(), 3);
    }

    #[test]
    fn center_rounds_down() {
        assert_eq!(GridDefinition::new_square(5).center(), GridPosition::new(2, 2));
        assert_eq!(GridDefinition::new(4, 6).center(), GridPosition::new(2, 3));
    }
}
