use crate::{
    generator::rules::TerrainIndex,
    grid::{GridData, GridDefinition, NodeIndex},
};

use super::GridNode;

/// Update sent by a [`crate::generator::Generator`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationUpdate {
    /// A node has been collapsed
    Generated(GridNode),
    /// The generation failed due to a contradiction at the specified node_index
    Failed(NodeIndex),
}

/// Observer with a queue of the [`GenerationUpdate`] sent by the [`crate::generator::Generator`] which also maintains a coherent state of the current generation in a [`GridData`]
///
/// Can be used in a different thread than the generator's thread.
pub struct QueuedStatefulObserver {
    grid_data: GridData<Option<TerrainIndex>>,
    receiver: crossbeam_channel::Receiver<GenerationUpdate>,
}

impl QueuedStatefulObserver {
    pub(crate) fn create(
        receiver: crossbeam_channel::Receiver<GenerationUpdate>,
        grid: &GridDefinition,
    ) -> Self {
        QueuedStatefulObserver {
            grid_data: grid.new_grid_data(None),
            receiver,
        }
    }

    /// Returns a reference to the observer's grid data
    pub fn grid_data(&self) -> &GridData<Option<TerrainIndex>> {
        &self.grid_data
    }

    /// Updates the internal state of the observer by dequeuing all queued updates.
    pub fn dequeue_all(&mut self) {
        while let Ok(update) = self.receiver.try_recv() {
            self.apply(update);
        }
    }

    fn apply(&mut self, update: GenerationUpdate) {
        match update {
            GenerationUpdate::Generated(grid_node) => self
                .grid_data
                .set(grid_node.node_index, Some(grid_node.terrain_index)),
            // Nodes collapsed before the contradiction stay valid, nothing to undo.
            GenerationUpdate::Failed(_) => (),
        }
    }
}

/// Observer with a queue of the [`GenerationUpdate`] sent by the [`crate::generator::Generator`]
///
/// Can be used in a different thread than the generator's thread.
pub struct QueuedObserver {
    receiver: crossbeam_channel::Receiver<GenerationUpdate>,
}

impl QueuedObserver {
    pub(crate) fn create(receiver: crossbeam_channel::Receiver<GenerationUpdate>) -> Self {
        QueuedObserver { receiver }
    }

    /// Dequeues all queued updates.
    ///
    /// Returns all retrieved [`GenerationUpdate`] in a `Vec`.
    /// The `Vec` may be empty if no update was queued.
    pub fn dequeue_all(&mut self) -> Vec<GenerationUpdate> {
        self.receiver.try_iter().collect()
    }
}
