use std::{
    io::{stdin, stdout, Write},
    thread, time,
};

use wfc_terrain::{
    generator::{
        builder::GeneratorBuilder, node_heuristic::NodeSelectionHeuristic, rules::RulesBuilder,
        GenerationStatus, RngMode, TerrainSelectionHeuristic,
    },
    grid::{GridData, GridDefinition},
    realizer::NoRealization,
};

pub enum GenerationViewMode {
    StepByStep(u64),
    StepByStepPaused,
}

const GENERATION_VIEW_MODE: GenerationViewMode = GenerationViewMode::StepByStep(150);

const ICONS: &[&str] = &["🗻", "⛰️ ", "🟫", "🟩", "🟦", "🟨"];

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let rules = RulesBuilder::default_terrain().build().unwrap();
    let mut builder = GeneratorBuilder::new()
        .with_rules(rules)
        .with_grid(GridDefinition::new(10, 6))
        .with_rng(RngMode::RandomSeed)
        .with_node_heuristic(NodeSelectionHeuristic::MinimumEntropy)
        .with_terrain_heuristic(TerrainSelectionHeuristic::Uniform);
    let mut observer = builder.add_queued_stateful_observer();
    let mut generator = builder.build().unwrap();
    println!("Seed: {}", generator.seed());

    let mut step = 0;
    loop {
        let status = generator.select_and_collapse(&mut NoRealization);
        observer.dequeue_all();
        println!("Grid at iteration n°{}:", step);
        display_grid(observer.grid_data());
        match status {
            Ok(GenerationStatus::Ongoing) => (),
            Ok(GenerationStatus::Done) => break,
            Err(err) => {
                println!("{}", err);
                break;
            }
        }
        match GENERATION_VIEW_MODE {
            GenerationViewMode::StepByStep(delay) => {
                thread::sleep(time::Duration::from_millis(delay));
            }
            GenerationViewMode::StepByStepPaused => pause(),
        }
        step += 1;
    }
}

fn display_grid(data_grid: &GridData<Option<usize>>) {
    for y in (0..data_grid.grid().size_y()).rev() {
        for x in 0..data_grid.grid().size_x() {
            match data_grid.get_2d(x, y) {
                None => print!("❓"),
                Some(terrain_index) => print!("{}", ICONS[*terrain_index]),
            }
        }
        println!();
    }
}

fn pause() {
    let mut word = String::new();
    let mut stdout = stdout();
    stdout.write_all(b"Press Enter to continue").unwrap();
    stdout.flush().unwrap();
    stdin().read_line(&mut word).unwrap();
}
