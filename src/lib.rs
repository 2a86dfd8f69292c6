use generator::rules::TerrainIndex;
use grid::{GridPosition, NodeIndex};

/// Defines a [`generator::Generator`] and its builder, rules, heuristics and observers
pub mod generator;
/// Defines the grid: positions, indexes, neighbours and [`grid::GridData`]
pub mod grid;
/// Defines the post-generation placement pass of satellite objects
pub mod placement;
/// Defines the [`realizer::Realizer`] contract used to turn a generation into visible geometry
pub mod realizer;

/// Error returned by a [`generator::Generator`] when a contradiction occurs: a node has no possible terrain left.
///
/// The generation is not retried, the generator stays in a failed state.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Failed to generate, contradiction at node with index {node_index} at position {position}")]
pub struct GenerationError {
    /// Index of the node that ended up with no possible terrain
    pub node_index: NodeIndex,
    /// Position of this node
    pub position: GridPosition,
}

/// Errors that can occur while building [`generator::rules::Rules`] or [`placement::PlacementRules`]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    #[error("Empty terrain types collection")]
    NoTerrainTypes,
    #[error("Terrain type {0:?} is registered more than once")]
    DuplicateTerrain(String),
    #[error("{referenced_by:?} references an unknown terrain type {name:?}")]
    UnknownTerrain { referenced_by: String, name: String },
    #[error("Terrain type {name:?} has a non-finite height {height}")]
    NonFiniteHeight { name: String, height: f32 },
    #[error("Object type {0:?} is registered more than once")]
    DuplicateObject(String),
    #[error("Object type {name:?} has an invalid slope range [{min_slope}, {max_slope}]")]
    InvalidSlopeRange {
        name: String,
        min_slope: f32,
        max_slope: f32,
    },
}

/// Errors reported by [`generator::builder::GeneratorBuilder::build`], before any collapse happens
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Grid size {size_x}x{size_y} is too small, each dimension must be at least {min}")]
    GridTooSmall { size_x: u32, size_y: u32, min: u32 },
    #[error("Cell size must be a finite positive value, got {0}")]
    InvalidCellSize(f32),
    #[error("Placement probability must be in [0, 1], got {0}")]
    InvalidPlacementProbability(f64),
    #[error("Max sub-cell offset must be in [0, 0.5], got {0}")]
    InvalidMaxOffset(f32),
    #[error("Seed cell {0} is outside of the grid")]
    SeedOutOfBounds(GridPosition),
    #[error("Seed terrain index {0} does not exist in the rules")]
    InvalidSeedTerrain(TerrainIndex),
    #[error("Invalid object table: {0}")]
    InvalidObjects(#[from] RulesError),
}

/// Errors that can occur when explicitly collapsing a node with [`generator::Generator::collapse`]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSetError {
    #[error("Node index {0} is not a valid node index for this grid")]
    InvalidNodeIndex(NodeIndex),
    #[error("Terrain index {0} does not exist in the rules")]
    InvalidTerrainIndex(TerrainIndex),
    #[error("Terrain {terrain_index} is not possible on node {node_index}")]
    IllegalTerrain {
        node_index: NodeIndex,
        terrain_index: TerrainIndex,
    },
    #[error(transparent)]
    Contradiction(#[from] GenerationError),
}

/// Errors of the placement pass
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    #[error("Objects can only be placed on a fully generated grid")]
    GenerationNotDone,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[cfg(test)]
mod tests {
    use crate::{
        generator::{builder::GeneratorBuilder, rules::RulesBuilder, RngMode},
        grid::GridDefinition,
        realizer::NoRealization,
    };

    #[test]
    fn generate_default_terrain() {
        let rules = RulesBuilder::default_terrain().build().unwrap();
        let mut generator = GeneratorBuilder::new()
            .with_rules(rules)
            .with_grid(GridDefinition::new_square(3))
            .with_default_objects()
            .with_rng(RngMode::Seeded(7))
            .build()
            .unwrap();
        let output = generator.run(&mut NoRealization).unwrap();
        assert_eq!(output.grid.nodes().len(), 9);
        assert_eq!(generator.collapsed_count(), 9);
    }
}
