use wfc_terrain::{
    generator::{
        builder::GeneratorBuilder,
        rules::{Rules, RulesBuilder, TerrainType},
        GenerationOutput, Generator, RngMode,
    },
    grid::{GridDefinition, GridPosition},
    placement::{slope_at, ObjectSpec, OBJECT_HEIGHT_FACTOR},
    realizer::{RealizationError, Realizer},
};

#[derive(Default)]
struct SceneRecorder {
    tiles: Vec<(GridPosition, String)>,
    objects: Vec<(String, [f32; 2], f32, String)>,
}

impl Realizer for SceneRecorder {
    fn realize_terrain(
        &mut self,
        position: GridPosition,
        terrain: &TerrainType,
    ) -> Result<(), RealizationError> {
        self.tiles.push((position, terrain.name().to_string()));
        Ok(())
    }

    fn realize_object(
        &mut self,
        object: &ObjectSpec,
        position: [f32; 2],
        height: f32,
        host: &TerrainType,
    ) -> Result<(), RealizationError> {
        self.objects.push((
            object.name().to_string(),
            position,
            height,
            host.name().to_string(),
        ));
        Ok(())
    }
}

fn generator(rules: &Rules, size: u32, seed: u64, cell_size: f32) -> Generator {
    GeneratorBuilder::new()
        .with_rules(rules.clone())
        .with_grid(GridDefinition::new_square(size))
        .with_default_objects()
        .with_placement_probability(0.5)
        .with_cell_size(cell_size)
        .with_rng(RngMode::Seeded(seed))
        .build()
        .unwrap()
}

/// Contradictions are possible with the default table: returns the first successful run.
fn first_successful_run(
    rules: &Rules,
    size: u32,
    cell_size: f32,
) -> (Generator, GenerationOutput, SceneRecorder) {
    for seed in 0..50 {
        let mut generator = generator(rules, size, seed, cell_size);
        let mut recorder = SceneRecorder::default();
        if let Ok(output) = generator.run(&mut recorder) {
            return (generator, output, recorder);
        }
    }
    panic!("no successful generation");
}

#[test]
fn default_terrain_end_to_end() {
    let rules = RulesBuilder::default_terrain().build().unwrap();
    let (generator, output, recorder) = first_successful_run(&rules, 6, 2.0);

    assert_eq!(recorder.tiles.len(), 36);
    // The seed cell is realized first
    assert_eq!(
        recorder.tiles[0],
        (GridPosition::new(3, 3), "mountain_peak".to_string())
    );
    assert_eq!(*output.grid.get_2d(3, 3), 0);

    let grid = output.grid.grid();
    for node in grid.indexes() {
        for neighbour in grid.neighbours(node) {
            assert!(rules.is_allowed_neighbour(
                *output.grid.get(node),
                *output.grid.get(neighbour)
            ));
        }
    }
    assert_eq!(generator.to_grid_data(), Some(output.grid));
}

#[test]
fn placed_objects_follow_their_constraints() {
    let rules = RulesBuilder::default_terrain().build().unwrap();
    let cell_size = 3.0;
    let (generator, output, recorder) = first_successful_run(&rules, 5, cell_size);
    let objects = generator.placement_rules();

    assert_eq!(recorder.objects.len(), output.placements.len());
    for (record, (name, world_position, height, host)) in
        output.placements.iter().zip(recorder.objects.iter())
    {
        let object = objects.object(record.object_index);
        assert_eq!(object.name(), name);

        let cell = GridPosition::new(
            record.position[0].round() as u32,
            record.position[1].round() as u32,
        );
        let node = output.grid.grid().get_index_from_pos(&cell);
        assert_eq!(*output.grid.get(node), record.terrain_index);
        assert!(object.is_eligible(record.terrain_index, slope_at(&output.grid, &rules, node)));

        for axis in 0..2 {
            let coordinate = if axis == 0 { cell.x } else { cell.y };
            assert!((record.position[axis] - coordinate as f32).abs() <= 0.4 + 1e-5);
            assert!((world_position[axis] - record.position[axis] * cell_size).abs() < 1e-4);
        }

        let terrain = rules.terrain(record.terrain_index);
        assert_eq!(host, terrain.name());
        assert_eq!(*height, terrain.height() * OBJECT_HEIGHT_FACTOR);
    }
}

#[test]
fn houses_only_on_flat_lowlands() {
    let rules = RulesBuilder::default_terrain().build().unwrap();
    for seed in 0..20 {
        let mut generator = generator(&rules, 6, seed, 2.0);
        let Ok(output) = generator.run(&mut SceneRecorder::default()) else {
            continue;
        };
        let house = generator.placement_rules().object_index("house").unwrap();
        for record in output.placements.iter().filter(|r| r.object_index == house) {
            let terrain = rules.terrain(record.terrain_index).name();
            assert!(terrain == "plateau" || terrain == "valley_floor");
            let cell = GridPosition::new(
                record.position[0].round() as u32,
                record.position[1].round() as u32,
            );
            let node = output.grid.grid().get_index_from_pos(&cell);
            assert!(slope_at(&output.grid, &rules, node) <= 0.2);
        }
    }
}

#[test]
fn shared_rules_between_generators() {
    let rules = std::sync::Arc::new(RulesBuilder::default_terrain().build().unwrap());
    let outputs: Vec<_> = (0..2)
        .map(|_| {
            GeneratorBuilder::new()
                .with_shared_rules(rules.clone())
                .with_grid(GridDefinition::new(4, 3))
                .with_rng(RngMode::Seeded(12))
                .build()
                .unwrap()
                .generate(&mut SceneRecorder::default())
        })
        .collect();
    assert_eq!(outputs[0], outputs[1]);
}
