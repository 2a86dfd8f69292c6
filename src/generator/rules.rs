use std::collections::HashMap;

use ndarray::{Array, Ix2};

#[cfg(feature = "debug-traces")]
use tracing::{trace, warn};

use crate::RulesError;

/// Index of a terrain type in some [`Rules`]. Terrain types are indexed in registration order.
pub type TerrainIndex = usize;

pub const MOUNTAIN_PEAK: &str = "mountain_peak";
pub const SLOPE: &str = "slope";
pub const PLATEAU: &str = "plateau";
pub const VALLEY_FLOOR: &str = "valley_floor";
pub const RIVERBED: &str = "riverbed";
pub const SHORELINE: &str = "shoreline";

/// Name, height and allowed neighbours of the default terrain types
const DEFAULT_TERRAIN: &[(&str, f32, &[&str])] = &[
    (MOUNTAIN_PEAK, 3.0, &[MOUNTAIN_PEAK, SLOPE]),
    (SLOPE, 2.0, &[MOUNTAIN_PEAK, SLOPE, PLATEAU, VALLEY_FLOOR]),
    (PLATEAU, 1.5, &[SLOPE, PLATEAU, VALLEY_FLOOR]),
    (VALLEY_FLOOR, 1.0, &[SLOPE, PLATEAU, VALLEY_FLOOR, RIVERBED]),
    (RIVERBED, 0.5, &[VALLEY_FLOOR, RIVERBED, SHORELINE]),
    (SHORELINE, 0.2, &[RIVERBED, SHORELINE]),
];

/// A kind of terrain a cell can collapse into.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainType {
    name: String,
    /// Relative height, only used to estimate slopes during the placement pass.
    height: f32,
    /// Weight factor used by [`super::TerrainSelectionHeuristic::WeightedProbability`].
    ///
    /// Defaults to 1.0
    weight: f32,
    /// Names of the terrain types allowed as direct neighbours of this one, in any direction.
    allowed_neighbours: Vec<String>,
}

impl TerrainType {
    /// Creates a [`TerrainType`] with no allowed neighbours and a weight of 1.0
    pub fn new<N: Into<String>>(name: N, height: f32) -> Self {
        Self {
            name: name.into(),
            height,
            weight: 1.0,
            allowed_neighbours: Vec::new(),
        }
    }

    /// Adds all the given terrain types names to the allowed neighbours of this terrain type.
    ///
    /// Names are resolved when the [`Rules`] are built.
    pub fn with_neighbours<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_neighbours
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Specify this terrain type weight. The `weight` value should be strictly superior to `0`. If it is not the case, the value will be overriden by `f32::MIN_POSITIVE`.
    pub fn with_weight<W: Into<f32>>(mut self, weight: W) -> Self {
        let mut checked_weight = weight.into();
        if !(checked_weight > 0.) {
            #[cfg(feature = "debug-traces")]
            warn!(
                "Terrain type {:?} has a non-positive weight {}, overriden to {}",
                self.name,
                checked_weight,
                f32::MIN_POSITIVE
            );
            checked_weight = f32::MIN_POSITIVE;
        }
        self.weight = checked_weight;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }
}

/// Used to create new [`Rules`]
///
/// ### Example
///
/// Two terrain types that only connect to themselves and to each other:
/// ```
/// use wfc_terrain::generator::rules::{RulesBuilder, TerrainType};
///
/// let rules = RulesBuilder::new()
///     .with_terrain(TerrainType::new("grass", 1.0).with_neighbours(["grass", "sand"]))
///     .with_terrain(TerrainType::new("sand", 0.5).with_neighbours(["grass", "sand"]))
///     .build()
///     .unwrap();
/// assert_eq!(rules.terrains_count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RulesBuilder {
    terrains: Vec<TerrainType>,
}

impl RulesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a builder pre-filled with the six types of the default terrain table, `mountain_peak` first.
    pub fn default_terrain() -> Self {
        let mut builder = Self::new();
        for &(name, height, neighbours) in DEFAULT_TERRAIN {
            let terrain =
                TerrainType::new(name, height).with_neighbours(neighbours.iter().copied());
            builder = builder.with_terrain(terrain);
        }
        builder
    }

    /// Registers a terrain type. Its [`TerrainIndex`] will be its registration order.
    pub fn with_terrain(mut self, terrain: TerrainType) -> Self {
        self.terrains.push(terrain);
        self
    }

    /// Builds the [`Rules`] from the current configuration of the [`RulesBuilder`]
    ///
    /// May return a [`RulesError`] if the terrain table is empty, contains duplicates, or references unknown terrain types.
    pub fn build(self) -> Result<Rules, RulesError> {
        Rules::new(self.terrains)
    }
}

/// Defines the rules of a generation: the terrain types and which ones may be adjacent.
///
/// A same set of [`Rules`] can be shared by multiple generators.
#[derive(Clone, Debug)]
pub struct Rules {
    terrains: Vec<TerrainType>,
    /// `adjacency[(from, to)]` is true if terrain `to` is allowed next to a collapsed terrain `from`.
    adjacency: Array<bool, Ix2>,
}

impl Rules {
    fn new(terrains: Vec<TerrainType>) -> Result<Rules, RulesError> {
        if terrains.is_empty() {
            return Err(RulesError::NoTerrainTypes);
        }

        let mut indexes = HashMap::with_capacity(terrains.len());
        for (index, terrain) in terrains.iter().enumerate() {
            if !terrain.height.is_finite() {
                return Err(RulesError::NonFiniteHeight {
                    name: terrain.name.clone(),
                    height: terrain.height,
                });
            }
            if indexes.insert(terrain.name.as_str(), index).is_some() {
                return Err(RulesError::DuplicateTerrain(terrain.name.clone()));
            }
        }

        let mut adjacency = Array::from_elem((terrains.len(), terrains.len()), false);
        for (from, terrain) in terrains.iter().enumerate() {
            for neighbour in &terrain.allowed_neighbours {
                let to = indexes
                    .get(neighbour.as_str())
                    .ok_or_else(|| RulesError::UnknownTerrain {
                        referenced_by: terrain.name.clone(),
                        name: neighbour.clone(),
                    })?;
                adjacency[(from, *to)] = true;
            }
        }

        drop(indexes);

        let rules = Rules {
            terrains,
            adjacency,
        };

        #[cfg(feature = "debug-traces")]
        {
            if !rules.is_symmetric() {
                warn!("Adjacency rules are not symmetric");
            }
            trace!("Successfully built rules, adjacency: {:?}", rules.adjacency);
        }

        Ok(rules)
    }

    /// Returns the number of terrain types in the rules
    #[inline]
    pub fn terrains_count(&self) -> usize {
        self.terrains.len()
    }

    /// Returns the terrain type at `index`.
    ///
    /// Panics if the index is not a valid terrain index.
    #[inline]
    pub fn terrain(&self, index: TerrainIndex) -> &TerrainType {
        &self.terrains[index]
    }

    /// Looks up a terrain type index by name
    pub fn terrain_index(&self, name: &str) -> Option<TerrainIndex> {
        self.terrains.iter().position(|terrain| terrain.name == name)
    }

    /// Returns true if `to` may be a direct neighbour of a node collapsed to `from`
    #[inline]
    pub fn is_allowed_neighbour(&self, from: TerrainIndex, to: TerrainIndex) -> bool {
        self.adjacency[(from, to)]
    }

    /// Returns an iterator over the terrain types allowed next to `from`
    pub fn allowed_neighbours(
        &self,
        from: TerrainIndex,
    ) -> impl Iterator<Item = TerrainIndex> + '_ {
        self.adjacency
            .row(from)
            .into_iter()
            .enumerate()
            .filter(|(_, allowed)| **allowed)
            .map(|(to, _)| to)
    }

    /// Returns true if every allowed adjacency is allowed both ways
    pub fn is_symmetric(&self) -> bool {
        self.adjacency == self.adjacency.t()
    }

    #[inline]
    pub(crate) fn weight(&self, index: TerrainIndex) -> f32 {
        self.terrains[index].weight
    }
}

#[cfg(test)]
mod tests {
    use super::{RulesBuilder, TerrainType, MOUNTAIN_PEAK, SHORELINE, SLOPE};
    use crate::RulesError;

    #[test]
    fn default_terrain_table() {
        let rules = RulesBuilder::default_terrain().build().unwrap();
        assert_eq!(rules.terrains_count(), 6);
        assert_eq!(rules.terrain_index(MOUNTAIN_PEAK), Some(0));
        assert!(rules.is_symmetric());

        let peak = rules.terrain_index(MOUNTAIN_PEAK).unwrap();
        let slope = rules.terrain_index(SLOPE).unwrap();
        let shoreline = rules.terrain_index(SHORELINE).unwrap();
        assert_eq!(
            rules.allowed_neighbours(peak).collect::<Vec<_>>(),
            vec![peak, slope]
        );
        assert!(!rules.is_allowed_neighbour(peak, shoreline));
        assert_eq!(rules.terrain(peak).height(), 3.0);
    }

    #[test]
    fn unknown_neighbour_is_rejected() {
        let res = RulesBuilder::new()
            .with_terrain(TerrainType::new("grass", 1.0).with_neighbours(["grass", "lava"]))
            .build();
        assert_eq!(
            res.unwrap_err(),
            RulesError::UnknownTerrain {
                referenced_by: "grass".to_string(),
                name: "lava".to_string()
            }
        );
    }

    #[test]
    fn invalid_tables_are_rejected() {
        assert_eq!(
            RulesBuilder::new().build().unwrap_err(),
            RulesError::NoTerrainTypes
        );
        let duplicate = RulesBuilder::new()
            .with_terrain(TerrainType::new("grass", 1.0))
            .with_terrain(TerrainType::new("grass", 2.0))
            .build();
        assert_eq!(
            duplicate.unwrap_err(),
            RulesError::DuplicateTerrain("grass".to_string())
        );
        let non_finite = RulesBuilder::new()
            .with_terrain(TerrainType::new("void", f32::NAN))
            .build();
        assert!(matches!(
            non_finite.unwrap_err(),
            RulesError::NonFiniteHeight { .. }
        ));
    }

    #[test]
    fn non_positive_weight_is_clamped() {
        let terrain = TerrainType::new("grass", 1.0).with_weight(-2_f32);
        assert_eq!(terrain.weight(), f32::MIN_POSITIVE);
    }

    #[test]
    fn asymmetric_rules_are_detected() {
        let rules = RulesBuilder::new()
            .with_terrain(TerrainType::new("a", 1.0).with_neighbours(["a", "b"]))
            .with_terrain(TerrainType::new("b", 1.0).with_neighbours(["b"]))
            .build()
            .unwrap();
        assert!(!rules.is_symmetric());
    }
}
