use std::collections::HashSet;

use ndarray::{Array, Ix2};
use rand::Rng;
use tracing::warn;

#[cfg(feature = "debug-traces")]
use tracing::{debug, trace};

use crate::{
    generator::rules::{
        Rules, TerrainIndex, MOUNTAIN_PEAK, PLATEAU, SHORELINE, SLOPE, VALLEY_FLOOR,
    },
    grid::{GridData, NodeIndex},
    realizer::Realizer,
    ConfigError, RulesError,
};

/// Index of an object type in some [`PlacementRules`]
pub type ObjectIndex = usize;

/// Default probability for an eligible object to be placed on a cell
pub const DEFAULT_PLACEMENT_PROBABILITY: f64 = 0.3;
/// Default maximum distance, in cell units, between a placed object and its cell center on each axis
pub const DEFAULT_MAX_OFFSET: f32 = 0.4;
/// Objects sit at `terrain height * OBJECT_HEIGHT_FACTOR`
pub const OBJECT_HEIGHT_FACTOR: f32 = 0.5;

pub const HOUSE: &str = "house";
pub const TREE: &str = "tree";
pub const ROCK: &str = "rock";

/// Input description of a placeable object type, referencing terrain types by name.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDefinition {
    name: String,
    valid_terrains: Vec<String>,
    min_slope: f32,
    max_slope: f32,
    size: f32,
}

impl ObjectDefinition {
    /// Creates an object placeable on the given terrain types, on any slope, with a size of 1.0
    pub fn new<N, I, S>(name: N, valid_terrains: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            valid_terrains: valid_terrains.into_iter().map(Into::into).collect(),
            min_slope: 0.,
            max_slope: f32::MAX,
            size: 1.0,
        }
    }

    /// Restricts the object to cells whose slope is in `[min_slope, max_slope]` (inclusive)
    pub fn with_slope_range(mut self, min_slope: f32, max_slope: f32) -> Self {
        self.min_slope = min_slope;
        self.max_slope = max_slope;
        self
    }

    /// Nominal footprint size, forwarded as is to the realizer
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

/// Resolved descriptor of a placeable object type.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSpec {
    name: String,
    /// Sorted and deduplicated
    valid_terrains: Vec<TerrainIndex>,
    min_slope: f32,
    max_slope: f32,
    size: f32,
}

impl ObjectSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn valid_terrains(&self) -> &[TerrainIndex] {
        &self.valid_terrains
    }

    pub fn min_slope(&self) -> f32 {
        self.min_slope
    }

    pub fn max_slope(&self) -> f32 {
        self.max_slope
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Returns true if this object may be placed on a cell of type `terrain` with the given `slope`
    pub fn is_eligible(&self, terrain: TerrainIndex, slope: f32) -> bool {
        self.valid_terrains.binary_search(&terrain).is_ok()
            && self.min_slope <= slope
            && slope <= self.max_slope
    }
}

/// The table of placeable object types, resolved against some [`Rules`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementRules {
    objects: Vec<ObjectSpec>,
}

impl PlacementRules {
    /// Resolves the object definitions against `rules`.
    ///
    /// May return a [`RulesError`] on duplicated object names, unknown terrain types or inverted slope ranges.
    pub fn new(definitions: Vec<ObjectDefinition>, rules: &Rules) -> Result<Self, RulesError> {
        let mut names = HashSet::with_capacity(definitions.len());
        let mut objects = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if !names.insert(definition.name.clone()) {
                return Err(RulesError::DuplicateObject(definition.name));
            }
            if !(definition.min_slope <= definition.max_slope) {
                return Err(RulesError::InvalidSlopeRange {
                    name: definition.name,
                    min_slope: definition.min_slope,
                    max_slope: definition.max_slope,
                });
            }
            let mut valid_terrains = definition
                .valid_terrains
                .iter()
                .map(|terrain| {
                    rules
                        .terrain_index(terrain)
                        .ok_or_else(|| RulesError::UnknownTerrain {
                            referenced_by: definition.name.clone(),
                            name: terrain.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            valid_terrains.sort_unstable();
            valid_terrains.dedup();

            objects.push(ObjectSpec {
                name: definition.name,
                valid_terrains,
                min_slope: definition.min_slope,
                max_slope: definition.max_slope,
                size: definition.size,
            });
        }
        Ok(Self { objects })
    }

    /// The default object table, resolved against `rules`. `rules` must contain the default terrain types.
    pub fn default_objects(rules: &Rules) -> Result<Self, RulesError> {
        Self::new(Self::default_definitions(), rules)
    }

    /// Definitions of the default object table: houses, trees and rocks.
    pub fn default_definitions() -> Vec<ObjectDefinition> {
        vec![
            ObjectDefinition::new(HOUSE, [PLATEAU, VALLEY_FLOOR])
                .with_slope_range(0., 0.2)
                .with_size(0.5),
            ObjectDefinition::new(TREE, [SLOPE, PLATEAU, VALLEY_FLOOR])
                .with_slope_range(0., 0.6)
                .with_size(0.3),
            ObjectDefinition::new(
                ROCK,
                [MOUNTAIN_PEAK, SLOPE, PLATEAU, VALLEY_FLOOR, SHORELINE],
            )
            .with_slope_range(0., 0.8)
            .with_size(0.2),
        ]
    }

    pub fn objects(&self) -> &[ObjectSpec] {
        &self.objects
    }

    /// Panics if the index is not a valid object index.
    pub fn object(&self, index: ObjectIndex) -> &ObjectSpec {
        &self.objects[index]
    }

    pub fn object_index(&self, name: &str) -> Option<ObjectIndex> {
        self.objects.iter().position(|object| object.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// An object placed by the placement pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRecord {
    pub object_index: ObjectIndex,
    /// Position in cell units: the cell coordinates plus a random sub-cell offset
    pub position: [f32; 2],
    /// Terrain type of the cell hosting the object
    pub terrain_index: TerrainIndex,
}

/// Tunable parameters of the placement pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementSettings {
    /// Independent probability for each (cell, eligible object) pair to receive the object
    pub probability: f64,
    /// Sub-cell offsets are drawn uniformly in `[-max_offset, max_offset]` on both axes
    pub max_offset: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            probability: DEFAULT_PLACEMENT_PROBABILITY,
            max_offset: DEFAULT_MAX_OFFSET,
        }
    }
}

impl PlacementSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0. ..=1.).contains(&self.probability) {
            return Err(ConfigError::InvalidPlacementProbability(self.probability));
        }
        if !(0. ..=0.5).contains(&self.max_offset) {
            return Err(ConfigError::InvalidMaxOffset(self.max_offset));
        }
        Ok(())
    }
}

/// Approximate slope of a cell: the maximum absolute height difference with its in-bounds neighbours.
///
/// Heights are the static heights of the terrain types. A cell without any neighbour has a slope of `0.0`.
pub fn slope_at(grid: &GridData<TerrainIndex>, rules: &Rules, node_index: NodeIndex) -> f32 {
    let height = rules.terrain(*grid.get(node_index)).height();
    grid.grid()
        .neighbours(node_index)
        .map(|neighbour| (height - rules.terrain(*grid.get(neighbour)).height()).abs())
        .fold(0., f32::max)
}

/// Slopes of a whole grid, indexed by `[(y, x)]`
pub fn slope_map(grid: &GridData<TerrainIndex>, rules: &Rules) -> Array<f32, Ix2> {
    let definition = grid.grid();
    Array::from_shape_fn(
        (definition.size_y() as usize, definition.size_x() as usize),
        |(y, x)| slope_at(grid, rules, definition.get_index(x as u32, y as u32)),
    )
}

/// Places satellite objects on a fully generated grid. Read-only over the grid.
pub struct PlacementPass<'a> {
    rules: &'a Rules,
    objects: &'a PlacementRules,
    settings: PlacementSettings,
    cell_size: f32,
}

impl<'a> PlacementPass<'a> {
    /// `settings` are expected to be valid, see [`PlacementSettings::validate`]
    pub fn new(
        rules: &'a Rules,
        objects: &'a PlacementRules,
        settings: PlacementSettings,
        cell_size: f32,
    ) -> Self {
        Self {
            rules,
            objects,
            settings,
            cell_size,
        }
    }

    /// Runs the pass over every cell of `grid`, in node index order, and returns the placed objects in placement order.
    ///
    /// Every placement is forwarded to `realizer`. Realization failures are logged and do not stop the pass.
    pub fn run<G: Rng, R: Realizer>(
        &self,
        grid: &GridData<TerrainIndex>,
        rng: &mut G,
        realizer: &mut R,
    ) -> Vec<PlacementRecord> {
        #[cfg(feature = "debug-traces")]
        debug!("Placing {} object type(s)", self.objects.objects().len());

        let mut records = Vec::new();
        if self.objects.is_empty() {
            return records;
        }
        let max_offset = self.settings.max_offset;
        for node_index in grid.grid().indexes() {
            let terrain_index = *grid.get(node_index);
            let slope = slope_at(grid, self.rules, node_index);
            let position = grid.grid().get_position(node_index);

            for (object_index, object) in self.objects.objects().iter().enumerate() {
                if !object.is_eligible(terrain_index, slope) {
                    continue;
                }
                if rng.gen::<f64>() >= self.settings.probability {
                    continue;
                }
                let offset_x = rng.gen_range(-max_offset..=max_offset);
                let offset_y = rng.gen_range(-max_offset..=max_offset);
                let record = PlacementRecord {
                    object_index,
                    position: [position.x as f32 + offset_x, position.y as f32 + offset_y],
                    terrain_index,
                };

                #[cfg(feature = "debug-traces")]
                trace!(
                    "Placed {} at {:?} on {} (slope {})",
                    object.name,
                    record.position,
                    self.rules.terrain(terrain_index).name(),
                    slope
                );

                let host = self.rules.terrain(terrain_index);
                if let Err(err) = realizer.realize_object(
                    object,
                    [
                        record.position[0] * self.cell_size,
                        record.position[1] * self.cell_size,
                    ],
                    host.height() * OBJECT_HEIGHT_FACTOR,
                    host,
                ) {
                    warn!("Object {} at {:?}: {}", object.name, record.position, err);
                }
                records.push(record);
            }
        }
        records
    }
}
