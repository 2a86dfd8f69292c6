use crate::{generator::rules::TerrainType, grid::GridPosition, placement::ObjectSpec};

/// Error a [`Realizer`] may return. The generator logs it and carries on: realization is a side effect and never alters the generation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to realize: {0}")]
pub struct RealizationError(pub String);

impl RealizationError {
    pub fn new<M: Into<String>>(message: M) -> Self {
        Self(message.into())
    }
}

/// Host side collaborator turning a generation into something visible (meshes, sprites, text, ...).
///
/// The generator calls it synchronously and never reads anything back: handles to the created geometry, pooling or templates are owned by the implementor.
pub trait Realizer {
    /// Called exactly once per collapsed node, in collapse order.
    fn realize_terrain(
        &mut self,
        position: GridPosition,
        terrain: &TerrainType,
    ) -> Result<(), RealizationError>;

    /// Called once per placed object, in placement order.
    ///
    /// `position` is the world position on the ground plane (already scaled by the cell size) and `height` the elevation the object should sit at.
    fn realize_object(
        &mut self,
        object: &ObjectSpec,
        position: [f32; 2],
        height: f32,
        host: &TerrainType,
    ) -> Result<(), RealizationError>;
}

/// A [`Realizer`] that does nothing. Useful when only the returned data or observers are of interest.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRealization;

impl Realizer for NoRealization {
    fn realize_terrain(
        &mut self,
        _: GridPosition,
        _: &TerrainType,
    ) -> Result<(), RealizationError> {
        Ok(())
    }

    fn realize_object(
        &mut self,
        _: &ObjectSpec,
        _: [f32; 2],
        _: f32,
        _: &TerrainType,
    ) -> Result<(), RealizationError> {
        Ok(())
    }
}

impl<R: Realizer + ?Sized> Realizer for &mut R {
    fn realize_terrain(
        &mut self,
        position: GridPosition,
        terrain: &TerrainType,
    ) -> Result<(), RealizationError> {
        (**self).realize_terrain(position, terrain)
    }

    fn realize_object(
        &mut self,
        object: &ObjectSpec,
        position: [f32; 2],
        height: f32,
        host: &TerrainType,
    ) -> Result<(), RealizationError> {
        (**self).realize_object(object, position, height, host)
    }
}
