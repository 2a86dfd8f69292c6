use std::sync::Arc;

use bitvec::{bitvec, vec::BitVec};
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    Rng,
};
use tracing::warn;

#[cfg(feature = "debug-traces")]
use tracing::{debug, info, trace};

use crate::{
    grid::{GridData, GridDefinition, GridPosition, NodeIndex, NodeRef},
    placement::{PlacementPass, PlacementRecord, PlacementRules, PlacementSettings},
    realizer::Realizer,
    GenerationError, NodeSetError, PlacementError,
};

use self::{
    builder::{GeneratorBuilder, Unset},
    node_heuristic::NodeSelectionHeuristic,
    observer::GenerationUpdate,
    rules::{Rules, TerrainIndex},
};

/// Defines a [`GeneratorBuilder`] used to create a generator
pub mod builder;
/// Defines the different possible [`NodeSelectionHeuristic`]
pub mod node_heuristic;
/// Defines different possible observers to view the results/execution of a [`Generator`]
pub mod observer;
/// Defines the [`Rules`] used by a [`Generator`]
pub mod rules;

/// Defines a heuristic for the choice of a terrain type among the possible ones when a node has been selected for generation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TerrainSelectionHeuristic {
    /// Choses a terrain type uniformly at random among the possible ones.
    #[default]
    Uniform,
    /// Choses a random terrain type among the possible ones, weighted by each terrain type weight.
    WeightedProbability,
}

/// Different ways to seed the RNG of the generator.
///
/// The same RNG drives node selection, terrain selection and object placement: two generators built with the same seed, rules and configuration produce identical outputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RngMode {
    /// The generator will use the given seed for its random source.
    Seeded(u64),
    /// The generator will use a random seed for its random source.
    ///
    /// The randomly generated seed can still be retrieved by calling `seed` on the generator once created.
    RandomSeed,
}

/// Represents the current generation state, if not failed.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum GenerationStatus {
    /// The generation has not ended yet.
    Ongoing,
    /// The generation ended succesfully. The whole grid is generated.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InternalGeneratorStatus {
    /// Initial state, the seed cell has not been applied yet.
    Init,
    /// Generation has not finished.
    Ongoing,
    /// Generation ended succesfully.
    Done,
    /// Generation failed due to a contradiction. Terminal.
    Failed(GenerationError),
}

/// A collapsed node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridNode {
    /// Index of the node in the [`GridDefinition`]
    pub node_index: NodeIndex,
    /// Terrain type the node collapsed to
    pub terrain_index: TerrainIndex,
}

/// State of a single node of the grid
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Terrain types still possible on the node, in index order. Empty means contradiction.
    Superposition(Vec<TerrainIndex>),
    /// The node is fixed to this terrain type, for good.
    Collapsed(TerrainIndex),
}

/// A node collapsed to a fixed terrain type when the generation starts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedCell {
    pub position: GridPosition,
    pub terrain_index: TerrainIndex,
}

/// Everything produced by [`Generator::run`]
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOutput {
    /// Terrain type of every node
    pub grid: GridData<TerrainIndex>,
    /// Placed objects, in placement order
    pub placements: Vec<PlacementRecord>,
}

/// Wave Function Collapse terrain generator.
///
/// Greedy and non-backtracking: a collapsed node is never reverted and a contradiction ends the generation.
/// Use a [`GeneratorBuilder`] to get an instance of a [`Generator`].
pub struct Generator {
    // === Read-only configuration ===
    grid: GridDefinition,
    rules: Arc<Rules>,
    placement_rules: PlacementRules,
    placement_settings: PlacementSettings,
    cell_size: f32,
    seed_cell: Option<SeedCell>,
    node_selection_heuristic: NodeSelectionHeuristic,
    terrain_selection_heuristic: TerrainSelectionHeuristic,

    // === Generation state ===
    status: InternalGeneratorStatus,
    seed: u64,
    rng: StdRng,
    /// `nodes[node_index * self.rules.terrains_count() + terrain_index]` is true (1) if terrain with index `terrain_index` is still allowed on node with index `node_index`
    nodes: BitVec<usize>,
    /// Stores how many terrain types are still possible for a given node
    candidates_counts: Vec<usize>,
    /// `collapsed[node_index]` is true once the node has been collapsed
    collapsed: BitVec<usize>,
    collapsed_count: usize,
    /// Observers signaled with updates of the nodes.
    observers: Vec<crossbeam_channel::Sender<GenerationUpdate>>,

    // === Constraint satisfaction algorithm data ===
    /// Nodes to propagate from
    propagation_stack: Vec<NodeIndex>,
}

impl Generator {
    /// Returns a new `GeneratorBuilder`
    pub fn builder() -> GeneratorBuilder<Unset, Unset> {
        GeneratorBuilder::new()
    }

    pub(crate) fn create(
        rules: Arc<Rules>,
        grid: GridDefinition,
        placement_rules: PlacementRules,
        placement_settings: PlacementSettings,
        cell_size: f32,
        seed_cell: Option<SeedCell>,
        node_selection_heuristic: NodeSelectionHeuristic,
        terrain_selection_heuristic: TerrainSelectionHeuristic,
        rng_mode: RngMode,
        observers: Vec<crossbeam_channel::Sender<GenerationUpdate>>,
    ) -> Self {
        let terrains_count = rules.terrains_count();
        let nodes_count = grid.total_size();

        let seed = match rng_mode {
            RngMode::Seeded(seed) => seed,
            RngMode::RandomSeed => rand::thread_rng().gen::<u64>(),
        };

        #[cfg(feature = "debug-traces")]
        debug!(
            "Creating generator for grid {} with {} terrain types, seed {}",
            grid, terrains_count, seed
        );

        Self {
            grid,
            rules,
            placement_rules,
            placement_settings,
            cell_size,
            seed_cell,
            node_selection_heuristic,
            terrain_selection_heuristic,

            status: InternalGeneratorStatus::Init,
            seed,
            rng: rand::SeedableRng::seed_from_u64(seed),
            nodes: bitvec![1; nodes_count * terrains_count],
            candidates_counts: vec![terrains_count; nodes_count],
            collapsed: bitvec![0; nodes_count],
            collapsed_count: 0,
            observers,

            propagation_stack: Vec::new(),
        }
    }

    /// Returns the seed that was used to initialize the generator RNG. See [`RngMode`] for more information.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the [`GridDefinition`] used by the generator
    pub fn grid(&self) -> &GridDefinition {
        &self.grid
    }

    /// Returns the [`Rules`] used by the generator
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Returns the [`PlacementRules`] used by the generator
    pub fn placement_rules(&self) -> &PlacementRules {
        &self.placement_rules
    }

    /// Returns the current [`GenerationStatus`], or the [`GenerationError`] that ended the generation.
    pub fn status(&self) -> Result<GenerationStatus, GenerationError> {
        match self.status {
            InternalGeneratorStatus::Init | InternalGeneratorStatus::Ongoing => {
                Ok(GenerationStatus::Ongoing)
            }
            InternalGeneratorStatus::Done => Ok(GenerationStatus::Done),
            InternalGeneratorStatus::Failed(err) => Err(err),
        }
    }

    /// How many nodes have been collapsed so far
    pub fn collapsed_count(&self) -> usize {
        self.collapsed_count
    }

    /// How many nodes are still in superposition
    pub fn nodes_left_to_generate(&self) -> usize {
        self.grid.total_size() - self.collapsed_count
    }

    /// Number of terrain types still possible on a node, 1 for a collapsed node.
    ///
    /// Panics if `node_index` is not a valid node index.
    pub fn candidates_count(&self, node_index: NodeIndex) -> usize {
        self.candidates_counts[node_index]
    }

    /// Returns the [`CellState`] of a node.
    ///
    /// Panics if `node_index` is not a valid node index.
    pub fn cell_state(&self, node_index: NodeIndex) -> CellState {
        match self.collapsed_terrain(node_index) {
            Some(terrain_index) => CellState::Collapsed(terrain_index),
            None => CellState::Superposition(
                (0..self.rules.terrains_count())
                    .filter(|&terrain| self.is_terrain_possible(node_index, terrain))
                    .collect(),
            ),
        }
    }

    /// Returns the terrain type of a collapsed node, `None` if the node is still in superposition.
    pub fn collapsed_terrain(&self, node_index: NodeIndex) -> Option<TerrainIndex> {
        if !self.collapsed[node_index] {
            return None;
        }
        let terrains_count = self.rules.terrains_count();
        self.nodes[node_index * terrains_count..(node_index + 1) * terrains_count].first_one()
    }

    /// Returns the fully generated grid, or `None` while some nodes are not collapsed yet.
    pub fn to_grid_data(&self) -> Option<GridData<TerrainIndex>> {
        (self.nodes_left_to_generate() == 0).then(|| self.collect_grid_data())
    }

    /// Selects the node with the lowest entropy (number of possible terrain types) among the nodes not collapsed yet, according to the [`NodeSelectionHeuristic`].
    ///
    /// Returns `None` if every node is collapsed.
    pub fn find_min_entropy_cell(&mut self) -> Option<NodeIndex> {
        let collapsed = &self.collapsed;
        self.node_selection_heuristic.select_node(
            &self.candidates_counts,
            |node_index| collapsed[node_index],
            &mut self.rng,
        )
    }

    /// Collapses a node to `terrain`, or to a terrain type picked by the [`TerrainSelectionHeuristic`] if `None`, then propagates the constraints.
    ///
    /// Returns `Ok(false)` and does nothing if the node is already collapsed or has no possible terrain left.
    /// Returns a [`NodeSetError`] if the node or terrain indexes are invalid, if `terrain` is not possible on this node anymore, or if the propagation led to a contradiction.
    pub fn collapse<N: Into<NodeRef>, R: Realizer>(
        &mut self,
        node: N,
        terrain: Option<TerrainIndex>,
        realizer: &mut R,
    ) -> Result<bool, NodeSetError> {
        if let InternalGeneratorStatus::Failed(err) = self.status {
            return Err(NodeSetError::Contradiction(err));
        }
        let node_index = match node.into() {
            NodeRef::Index(index) if index < self.grid.total_size() => index,
            NodeRef::Pos(position) if self.grid.contains(&position) => {
                self.grid.get_index_from_pos(&position)
            }
            node_ref => return Err(NodeSetError::InvalidNodeIndex(node_ref.to_index(&self.grid))),
        };
        if self.collapsed[node_index] || self.candidates_counts[node_index] == 0 {
            return Ok(false);
        }
        let terrain_index = match terrain {
            Some(terrain_index) => {
                if terrain_index >= self.rules.terrains_count() {
                    return Err(NodeSetError::InvalidTerrainIndex(terrain_index));
                }
                if !self.is_terrain_possible(node_index, terrain_index) {
                    return Err(NodeSetError::IllegalTerrain {
                        node_index,
                        terrain_index,
                    });
                }
                terrain_index
            }
            None => self.select_terrain(node_index),
        };
        self.internal_collapse(node_index, terrain_index, realizer)?;
        Ok(true)
    }

    /// Advances the generation by one "step": applies the seed cell on the first call, else selects a node and a terrain type and propagates the changes.
    ///
    /// Returns the [`GenerationStatus`] if the step executed successfully and a [`GenerationError`] if the generation failed due to a contradiction.
    /// Once failed, every subsequent call returns the same error.
    pub fn select_and_collapse<R: Realizer>(
        &mut self,
        realizer: &mut R,
    ) -> Result<GenerationStatus, GenerationError> {
        match self.status {
            InternalGeneratorStatus::Failed(err) => return Err(err),
            InternalGeneratorStatus::Done => return Ok(GenerationStatus::Done),
            InternalGeneratorStatus::Init => {
                self.status = InternalGeneratorStatus::Ongoing;
                let collapsed_before = self.collapsed_count;
                self.apply_seed_cell(realizer)?;
                if self.collapsed_count > collapsed_before {
                    return self.status();
                }
            }
            InternalGeneratorStatus::Ongoing => (),
        }

        match self.find_min_entropy_cell() {
            Some(node_index) => {
                let terrain_index = self.select_terrain(node_index);
                self.internal_collapse(node_index, terrain_index, realizer)?;
            }
            None => self.status = InternalGeneratorStatus::Done,
        }
        self.status()
    }

    /// Collapses every node of the grid, starting with the seed cell, and returns the generated grid.
    ///
    /// Every collapse is forwarded to `realizer`. Not retried on contradiction.
    pub fn generate<R: Realizer>(
        &mut self,
        realizer: &mut R,
    ) -> Result<GridData<TerrainIndex>, GenerationError> {
        while self.select_and_collapse(&mut *realizer)? == GenerationStatus::Ongoing {}

        #[cfg(feature = "debug-traces")]
        info!(
            "Terrain generation completed, {} nodes collapsed",
            self.collapsed_count
        );

        Ok(self.collect_grid_data())
    }

    /// Runs the placement pass over the generated grid and returns the placed objects.
    ///
    /// Returns [`PlacementError::GenerationNotDone`] if some nodes are not collapsed yet.
    pub fn place_objects<R: Realizer>(
        &mut self,
        realizer: &mut R,
    ) -> Result<Vec<PlacementRecord>, PlacementError> {
        if let InternalGeneratorStatus::Failed(err) = self.status {
            return Err(PlacementError::Generation(err));
        }
        let grid = self.to_grid_data().ok_or(PlacementError::GenerationNotDone)?;
        Ok(self.internal_place_objects(&grid, realizer))
    }

    /// Generates the whole grid then places the objects on it.
    pub fn run<R: Realizer>(
        &mut self,
        realizer: &mut R,
    ) -> Result<GenerationOutput, GenerationError> {
        let grid = self.generate(&mut *realizer)?;
        let placements = self.internal_place_objects(&grid, realizer);
        Ok(GenerationOutput { grid, placements })
    }

    fn internal_place_objects<R: Realizer>(
        &mut self,
        grid: &GridData<TerrainIndex>,
        realizer: &mut R,
    ) -> Vec<PlacementRecord> {
        PlacementPass::new(
            &self.rules,
            &self.placement_rules,
            self.placement_settings,
            self.cell_size,
        )
        .run(grid, &mut self.rng, realizer)
    }

    fn apply_seed_cell<R: Realizer>(&mut self, realizer: &mut R) -> Result<(), GenerationError> {
        let Some(seed_cell) = self.seed_cell else {
            return Ok(());
        };
        let node_index = self.grid.get_index_from_pos(&seed_cell.position);
        if self.collapsed[node_index] {
            return Ok(());
        }
        if !self.is_terrain_possible(node_index, seed_cell.terrain_index) {
            // Only reachable when nodes were collapsed explicitly before the generation started.
            let err = GenerationError {
                node_index,
                position: seed_cell.position,
            };
            self.signal_contradiction(err);
            return Err(err);
        }

        #[cfg(feature = "debug-traces")]
        debug!(
            "Seeding node {} with terrain {}",
            seed_cell.position,
            self.rules.terrain(seed_cell.terrain_index).name()
        );

        self.internal_collapse(node_index, seed_cell.terrain_index, realizer)
    }

    fn internal_collapse<R: Realizer>(
        &mut self,
        node_index: NodeIndex,
        terrain_index: TerrainIndex,
        realizer: &mut R,
    ) -> Result<(), GenerationError> {
        let terrains_count = self.rules.terrains_count();
        for terrain in 0..terrains_count {
            self.nodes
                .set(node_index * terrains_count + terrain, terrain == terrain_index);
        }
        self.candidates_counts[node_index] = 1;
        self.collapsed.set(node_index, true);
        self.collapsed_count += 1;

        let position = self.grid.get_position(node_index);

        #[cfg(feature = "debug-traces")]
        {
            debug!(
                "Collapsed node {} at position {} to {}",
                node_index,
                position,
                self.rules.terrain(terrain_index).name()
            );
            let total = self.grid.total_size();
            if self.collapsed_count % 5 == 0 || self.collapsed_count == total {
                info!(
                    "Terrain generation progress: {:.1}%",
                    self.collapsed_count as f32 * 100. / total as f32
                );
            }
        }

        self.signal_selection(node_index, terrain_index);

        if let Err(err) = realizer.realize_terrain(position, self.rules.terrain(terrain_index)) {
            warn!("Terrain at {}: {}", position, err);
        }

        if let Err(err) = self.propagate(node_index) {
            self.signal_contradiction(err);
            return Err(err);
        }

        if self.nodes_left_to_generate() == 0 {
            self.status = InternalGeneratorStatus::Done;
        }
        Ok(())
    }

    /// Restricts the possible terrain types of the neighbours of collapsed nodes, starting from `from`.
    ///
    /// Returns a [`GenerationError`] if a node has no possible terrain left. Does not modify the generator internal status.
    fn propagate(&mut self, from: NodeIndex) -> Result<(), GenerationError> {
        // Clone the ref to allow for mutability of other members in the interior loops
        let rules = Arc::clone(&self.rules);
        let terrains_count = rules.terrains_count();

        self.propagation_stack.push(from);
        while let Some(node_index) = self.propagation_stack.pop() {
            // Nodes still in superposition do not constrain their neighbours.
            let Some(terrain_index) = self.collapsed_terrain(node_index) else {
                continue;
            };
            let position = self.grid.get_position(node_index);

            for &dir in self.grid.directions() {
                let Some(neighbour) = self.grid.get_next_index(&position, dir) else {
                    continue;
                };
                if self.collapsed[neighbour] {
                    continue;
                }

                let mut removed = 0;
                for candidate in 0..terrains_count {
                    if self.is_terrain_possible(neighbour, candidate)
                        && !rules.is_allowed_neighbour(terrain_index, candidate)
                    {
                        self.nodes.set(neighbour * terrains_count + candidate, false);
                        removed += 1;
                    }
                }
                if removed == 0 {
                    continue;
                }

                let candidates_left = &mut self.candidates_counts[neighbour];
                *candidates_left -= removed;

                #[cfg(feature = "debug-traces")]
                trace!(
                    "Node {} at {} constrained node {}: {} terrain(s) removed, {} left",
                    node_index,
                    position,
                    neighbour,
                    removed,
                    candidates_left
                );

                if *candidates_left == 0 {
                    self.propagation_stack.clear();
                    return Err(GenerationError {
                        node_index: neighbour,
                        position: self.grid.get_position(neighbour),
                    });
                }
                self.propagation_stack.push(neighbour);
            }
        }
        Ok(())
    }

    /// There should at least be one possible terrain for this node index. May panic otherwise.
    fn select_terrain(&mut self, node_index: NodeIndex) -> TerrainIndex {
        let possible_terrains: Vec<TerrainIndex> = (0..self.rules.terrains_count())
            .filter(|&terrain| self.is_terrain_possible(node_index, terrain))
            .collect();

        match self.terrain_selection_heuristic {
            TerrainSelectionHeuristic::Uniform => {
                possible_terrains[self.rng.gen_range(0..possible_terrains.len())]
            }
            TerrainSelectionHeuristic::WeightedProbability => {
                match WeightedIndex::new(
                    possible_terrains
                        .iter()
                        .map(|&terrain| self.rules.weight(terrain)),
                ) {
                    Ok(distribution) => possible_terrains[distribution.sample(&mut self.rng)],
                    // Weights are clamped to be strictly positive
                    Err(_) => possible_terrains[self.rng.gen_range(0..possible_terrains.len())],
                }
            }
        }
    }

    #[inline]
    fn is_terrain_possible(&self, node_index: NodeIndex, terrain_index: TerrainIndex) -> bool {
        self.nodes[node_index * self.rules.terrains_count() + terrain_index]
    }

    /// Should only be called when the nodes are fully generated
    fn collect_grid_data(&self) -> GridData<TerrainIndex> {
        let terrains = self
            .grid
            .indexes()
            .map(|node_index| self.collapsed_terrain(node_index).unwrap_or(0))
            .collect();
        GridData::new(self.grid.clone(), terrains)
    }

    fn signal_selection(&mut self, node_index: NodeIndex, terrain_index: TerrainIndex) {
        let update = GenerationUpdate::Generated(GridNode {
            node_index,
            terrain_index,
        });
        for obs in &mut self.observers {
            let _ = obs.send(update);
        }
    }

    fn signal_contradiction(&mut self, err: GenerationError) {
        #[cfg(feature = "debug-traces")]
        debug!("Generation failed due to a contradiction: {}", err);

        self.status = InternalGeneratorStatus::Failed(err);
        for obs in &mut self.observers {
            let _ = obs.send(GenerationUpdate::Failed(err.node_index));
        }
    }
}
