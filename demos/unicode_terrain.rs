use std::error::Error;

use wfc_terrain::{
    generator::{builder::GeneratorBuilder, rules::RulesBuilder, rules::TerrainType, RngMode},
    grid::{GridDefinition, GridPosition},
    placement::ObjectSpec,
    realizer::{RealizationError, Realizer},
};

// Same order as the default terrain table
const ICONS: &[&str] = &["🗻", "⛰️ ", "🟫", "🟩", "🟦", "🟨"];

/// Counts what would be spawned in a real scene
#[derive(Default)]
struct SpawnCounter {
    terrain_tiles: usize,
    objects: Vec<String>,
}

impl Realizer for SpawnCounter {
    fn realize_terrain(
        &mut self,
        _position: GridPosition,
        _terrain: &TerrainType,
    ) -> Result<(), RealizationError> {
        self.terrain_tiles += 1;
        Ok(())
    }

    fn realize_object(
        &mut self,
        object: &ObjectSpec,
        position: [f32; 2],
        height: f32,
        host: &TerrainType,
    ) -> Result<(), RealizationError> {
        self.objects.push(format!(
            "{} (size {}) at ({:.2}, {:.2}), elevation {:.2}, on {}",
            object.name(),
            object.size(),
            position[0],
            position[1],
            height,
            host.name()
        ));
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let rules = RulesBuilder::default_terrain().build()?;

    // A contradiction is fatal for a generator: try a few seeds.
    for seed in 0..10 {
        let mut generator = GeneratorBuilder::new()
            .with_rules(rules.clone())
            .with_grid(GridDefinition::new(12, 8))
            .with_default_objects()
            .with_rng(RngMode::Seeded(seed))
            .build()?;

        let mut realizer = SpawnCounter::default();
        match generator.run(&mut realizer) {
            Ok(output) => {
                println!("Seed {}:", generator.seed());
                // We draw from top to bottom
                for y in (0..output.grid.grid().size_y()).rev() {
                    for x in 0..output.grid.grid().size_x() {
                        print!("{}", ICONS[*output.grid.get_2d(x, y)]);
                    }
                    println!();
                }
                println!("{} terrain tiles realized", realizer.terrain_tiles);
                for object in &realizer.objects {
                    println!("  {}", object);
                }
                return Ok(());
            }
            Err(err) => println!("Seed {}: {}", seed, err),
        }
    }
    println!("Every seed led to a contradiction");
    Ok(())
}
