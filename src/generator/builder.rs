use std::{marker::PhantomData, sync::Arc};

use crate::{
    grid::{GridDefinition, GridPosition},
    placement::{ObjectDefinition, PlacementRules, PlacementSettings},
    ConfigError,
};

use super::{
    node_heuristic::NodeSelectionHeuristic,
    observer::{GenerationUpdate, QueuedObserver, QueuedStatefulObserver},
    rules::{Rules, TerrainIndex},
    Generator, RngMode, SeedCell, TerrainSelectionHeuristic,
};

/// Smallest accepted size for each dimension of the grid
pub const MIN_GRID_SIZE: u32 = 3;
/// Default size of a cell in world units
pub const DEFAULT_CELL_SIZE: f32 = 2.0;

/// Internal type used to provide a type-safe builder with compatible [`GridDefinition`] and [`Rules`]
pub enum Set {}
/// Internal type used to provide a type-safe builder with compatible [`GridDefinition`] and [`Rules`]
pub enum Unset {}

#[derive(Clone, Copy, Debug)]
enum SeedCellSetting {
    /// Grid center, first registered terrain type
    Default,
    Custom(SeedCell),
    Disabled,
}

/// Used to instantiate a new [`Generator`].
///
/// [`Rules`] and [`GridDefinition`] are the two non-optionnal structs that are needed before being able to call `build`.
///
/// ### Example
///
/// ```
/// use wfc_terrain::{grid::GridDefinition, generator::{builder::GeneratorBuilder, rules::RulesBuilder, RngMode}};
///
/// let rules = RulesBuilder::default_terrain().build().unwrap();
/// let generator = GeneratorBuilder::new()
///    .with_rules(rules)
///    .with_grid(GridDefinition::new(10, 8))
///    .with_rng(RngMode::Seeded(42))
///    .build()
///    .unwrap();
/// assert_eq!(generator.seed(), 42);
/// ```
pub struct GeneratorBuilder<G, R> {
    rules: Option<Arc<Rules>>,
    grid: Option<GridDefinition>,
    objects: Vec<ObjectDefinition>,
    placement_settings: PlacementSettings,
    cell_size: f32,
    seed_cell: SeedCellSetting,
    node_selection_heuristic: NodeSelectionHeuristic,
    terrain_selection_heuristic: TerrainSelectionHeuristic,
    rng_mode: RngMode,
    observers: Vec<crossbeam_channel::Sender<GenerationUpdate>>,
    typestate: PhantomData<(G, R)>,
}

impl Default for GeneratorBuilder<Unset, Unset> {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorBuilder<Unset, Unset> {
    /// Creates a [`GeneratorBuilder`] with its values set to their default.
    pub fn new() -> Self {
        Self {
            rules: None,
            grid: None,
            objects: Vec::new(),
            placement_settings: PlacementSettings::default(),
            cell_size: DEFAULT_CELL_SIZE,
            seed_cell: SeedCellSetting::Default,
            node_selection_heuristic: NodeSelectionHeuristic::default(),
            terrain_selection_heuristic: TerrainSelectionHeuristic::default(),
            rng_mode: RngMode::RandomSeed,
            observers: Vec::new(),
            typestate: PhantomData,
        }
    }

    /// Sets the [`Rules`] to be used by the [`Generator`]
    pub fn with_rules(self, rules: Rules) -> GeneratorBuilder<Unset, Set> {
        self.with_shared_rules(Arc::new(rules))
    }

    /// Sets the [`Rules`] to be used by the [`Generator`]. The `Generator` will hold a read-only Arc onto those `Rules` which can be safely shared by multiple `Generator`.
    pub fn with_shared_rules(self, rules: Arc<Rules>) -> GeneratorBuilder<Unset, Set> {
        GeneratorBuilder {
            rules: Some(rules),

            grid: self.grid,
            objects: self.objects,
            placement_settings: self.placement_settings,
            cell_size: self.cell_size,
            seed_cell: self.seed_cell,
            node_selection_heuristic: self.node_selection_heuristic,
            terrain_selection_heuristic: self.terrain_selection_heuristic,
            rng_mode: self.rng_mode,
            observers: self.observers,

            typestate: PhantomData,
        }
    }
}

impl GeneratorBuilder<Unset, Set> {
    /// Sets the [`GridDefinition`] to be used by the [`Generator`].
    pub fn with_grid(self, grid: GridDefinition) -> GeneratorBuilder<Set, Set> {
        GeneratorBuilder {
            grid: Some(grid),

            rules: self.rules,
            objects: self.objects,
            placement_settings: self.placement_settings,
            cell_size: self.cell_size,
            seed_cell: self.seed_cell,
            node_selection_heuristic: self.node_selection_heuristic,
            terrain_selection_heuristic: self.terrain_selection_heuristic,
            rng_mode: self.rng_mode,
            observers: self.observers,

            typestate: PhantomData,
        }
    }
}

impl<G, R> GeneratorBuilder<G, R> {
    /// Size of a cell in world units, used to scale the object positions given to the realizer. Defaults to [`DEFAULT_CELL_SIZE`].
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }
    /// Collapses the node at `position` to `terrain_index` when the generation starts, instead of the first terrain type at the grid center.
    pub fn with_seed_cell(mut self, position: GridPosition, terrain_index: TerrainIndex) -> Self {
        self.seed_cell = SeedCellSetting::Custom(SeedCell {
            position,
            terrain_index,
        });
        self
    }
    /// The generation starts directly with the node selection heuristic.
    pub fn without_seed_cell(mut self) -> Self {
        self.seed_cell = SeedCellSetting::Disabled;
        self
    }
    /// Specifies the [`NodeSelectionHeuristic`] to be used by the [`Generator`]. Defaults to [`NodeSelectionHeuristic::MinimumEntropy`].
    pub fn with_node_heuristic(mut self, heuristic: NodeSelectionHeuristic) -> Self {
        self.node_selection_heuristic = heuristic;
        self
    }
    /// Specifies the [`TerrainSelectionHeuristic`] to be used by the [`Generator`]. Defaults to [`TerrainSelectionHeuristic::Uniform`].
    pub fn with_terrain_heuristic(mut self, heuristic: TerrainSelectionHeuristic) -> Self {
        self.terrain_selection_heuristic = heuristic;
        self
    }
    /// Specifies the [`RngMode`] to be used by the [`Generator`]. Defaults to [`RngMode::RandomSeed`].
    pub fn with_rng(mut self, rng_mode: RngMode) -> Self {
        self.rng_mode = rng_mode;
        self
    }
    /// Objects that may be placed once the grid is generated. No objects by default.
    ///
    /// Terrain types are referenced by name and resolved against the generator [`Rules`] in `build`.
    pub fn with_objects(mut self, objects: Vec<ObjectDefinition>) -> Self {
        self.objects = objects;
        self
    }
    /// Uses the default object table (houses, trees and rocks), see [`PlacementRules::default_definitions`].
    pub fn with_default_objects(self) -> Self {
        self.with_objects(PlacementRules::default_definitions())
    }
    /// Probability for each eligible (cell, object) pair to receive the object.
    pub fn with_placement_probability(mut self, probability: f64) -> Self {
        self.placement_settings.probability = probability;
        self
    }
    /// Maximum random offset of a placed object from its cell center, in cell units.
    pub fn with_max_offset(mut self, max_offset: f32) -> Self {
        self.placement_settings.max_offset = max_offset;
        self
    }
}

impl GeneratorBuilder<Set, Set> {
    /// Registers an observer that keeps its own copy of the collapsed nodes.
    pub fn add_queued_stateful_observer(&mut self) -> QueuedStatefulObserver {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.observers.push(sender);
        // We know that self.grid is `Some` thanks to the typing.
        let grid = self.grid.clone().unwrap();
        QueuedStatefulObserver::create(receiver, &grid)
    }

    /// Registers an observer receiving every [`GenerationUpdate`].
    pub fn add_queued_observer(&mut self) -> QueuedObserver {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.observers.push(sender);
        QueuedObserver::create(receiver)
    }

    /// Instantiates a [`Generator`] as specified by the various builder parameters.
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid, or if an object references a terrain type unknown to the rules. Nothing is collapsed yet.
    pub fn build(self) -> Result<Generator, ConfigError> {
        // We know that self.rules and self.grid are `Some` thanks to the typing.
        let rules = self.rules.unwrap();
        let grid = self.grid.unwrap();

        if grid.size_x() < MIN_GRID_SIZE || grid.size_y() < MIN_GRID_SIZE {
            return Err(ConfigError::GridTooSmall {
                size_x: grid.size_x(),
                size_y: grid.size_y(),
                min: MIN_GRID_SIZE,
            });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0. {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        self.placement_settings.validate()?;
        let placement_rules = PlacementRules::new(self.objects, &rules)?;

        let seed_cell = match self.seed_cell {
            SeedCellSetting::Disabled => None,
            SeedCellSetting::Default => Some(SeedCell {
                position: grid.center(),
                terrain_index: 0,
            }),
            SeedCellSetting::Custom(seed_cell) => {
                if !grid.contains(&seed_cell.position) {
                    return Err(ConfigError::SeedOutOfBounds(seed_cell.position));
                }
                if seed_cell.terrain_index >= rules.terrains_count() {
                    return Err(ConfigError::InvalidSeedTerrain(seed_cell.terrain_index));
                }
                Some(seed_cell)
            }
        };

        Ok(Generator::create(
            rules,
            grid,
            placement_rules,
            self.placement_settings,
            self.cell_size,
            seed_cell,
            self.node_selection_heuristic,
            self.terrain_selection_heuristic,
            self.rng_mode,
            self.observers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        generator::rules::{RulesBuilder, TerrainType, MOUNTAIN_PEAK, PLATEAU},
        grid::{GridDefinition, GridPosition},
        placement::{ObjectDefinition, HOUSE},
        ConfigError, RulesError,
    };

    use super::{GeneratorBuilder, Set, MIN_GRID_SIZE};

    fn builder(size_x: u32, size_y: u32) -> GeneratorBuilder<Set, Set> {
        GeneratorBuilder::new()
            .with_rules(RulesBuilder::default_terrain().build().unwrap())
            .with_grid(GridDefinition::new(size_x, size_y))
    }

    #[test]
    fn rejects_small_grids() {
        assert_eq!(
            builder(2, 10).build().err(),
            Some(ConfigError::GridTooSmall {
                size_x: 2,
                size_y: 10,
                min: MIN_GRID_SIZE
            })
        );
        assert!(builder(3, 3).build().is_ok());
    }

    #[test]
    fn rejects_invalid_settings() {
        assert_eq!(
            builder(4, 4).with_cell_size(0.).build().err(),
            Some(ConfigError::InvalidCellSize(0.))
        );
        assert!(matches!(
            builder(4, 4).with_cell_size(f32::NAN).build(),
            Err(ConfigError::InvalidCellSize(_))
        ));
        assert_eq!(
            builder(4, 4).with_placement_probability(1.5).build().err(),
            Some(ConfigError::InvalidPlacementProbability(1.5))
        );
        assert_eq!(
            builder(4, 4).with_max_offset(0.75).build().err(),
            Some(ConfigError::InvalidMaxOffset(0.75))
        );
    }

    #[test]
    fn rejects_invalid_seed_cell() {
        assert_eq!(
            builder(4, 4)
                .with_seed_cell(GridPosition::new(4, 0), 0)
                .build()
                .err(),
            Some(ConfigError::SeedOutOfBounds(GridPosition::new(4, 0)))
        );
        assert_eq!(
            builder(4, 4)
                .with_seed_cell(GridPosition::new(1, 1), 6)
                .build()
                .err(),
            Some(ConfigError::InvalidSeedTerrain(6))
        );
    }

    #[test]
    fn nothing_collapsed_after_build() {
        let generator = builder(5, 4).build().unwrap();
        assert_eq!(generator.collapsed_count(), 0);
        assert_eq!(generator.nodes_left_to_generate(), 20);
    }

    #[test]
    fn objects_are_resolved_against_the_generator_rules() {
        let grass_only = RulesBuilder::new()
            .with_terrain(TerrainType::new("grass", 1.0).with_neighbours(["grass"]))
            .build()
            .unwrap();
        let res = GeneratorBuilder::new()
            .with_rules(grass_only)
            .with_grid(GridDefinition::new_square(4))
            .with_objects(vec![ObjectDefinition::new(HOUSE, [PLATEAU])])
            .build();
        assert_eq!(
            res.err(),
            Some(ConfigError::InvalidObjects(RulesError::UnknownTerrain {
                referenced_by: HOUSE.to_string(),
                name: PLATEAU.to_string()
            }))
        );

        let generator = builder(4, 4).with_default_objects().build().unwrap();
        let objects = generator.placement_rules();
        let house = objects.object(objects.object_index(HOUSE).unwrap());
        let peak = generator.rules().terrain_index(MOUNTAIN_PEAK).unwrap();
        let plateau = generator.rules().terrain_index(PLATEAU).unwrap();
        assert!(!house.is_eligible(peak, 0.));
        assert!(house.is_eligible(plateau, 0.));
    }
}
