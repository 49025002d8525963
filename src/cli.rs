use std::sync::Arc;

use crate::battle::{NewBattle, Question, TeamEntry};
use crate::combat::{Catalog, Difficulty};
use crate::config::EngineConfig;
use crate::engine::RaidEngine;
use crate::export::standings_to_csv;
use crate::parallel::{simulate_raid, SimulationConfig};
use crate::server;
use crate::store::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Simulate,
    Catalog,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("simulate") => Some(Command::Simulate),
        Some("catalog") => Some(Command::Catalog),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(),
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Catalog) => handle_catalog(args),
        None => {
            eprintln!("usage: bossraid <serve|simulate [teams] [seed] [--csv]|catalog [path]>");
            2
        }
    }
}

fn handle_serve() -> i32 {
    let config = EngineConfig::from_env();
    let catalog = match config.load_catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::warn!(%err, "rejected catalog file");
            eprintln!("catalog error: {err}");
            return 1;
        }
    };
    let engine = Arc::new(RaidEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(catalog),
        &config,
    ));
    match server::run_server(&config.bind, engine) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_simulate(args: &[String]) -> i32 {
    let positional: Vec<&String> = args.iter().skip(2).filter(|a| !a.starts_with("--")).collect();
    let teams = parse_u32_arg(positional.first().copied(), "teams", 4).max(1);
    let seed = parse_u64_arg(positional.get(1).copied(), "seed", 7);
    let as_csv = args.iter().any(|arg| arg == "--csv");

    let config = EngineConfig {
        seed: Some(seed),
        ..EngineConfig::from_env()
    };
    let catalog = match config.load_catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("catalog error: {err}");
            return 1;
        }
    };
    let engine = RaidEngine::new(Arc::new(MemoryStore::new()), Arc::new(catalog), &config);

    let battle = match engine.create_battle(demo_battle(teams)) {
        Ok(battle) => battle,
        Err(err) => {
            eprintln!("failed to create battle: {err}");
            return 1;
        }
    };
    let report = match simulate_raid(
        &engine,
        &battle.id,
        SimulationConfig {
            seed,
            ..SimulationConfig::default()
        },
    ) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            return 1;
        }
    };

    if as_csv {
        let finished = match engine.get_battle(&battle.id) {
            Ok(Some(battle)) => battle,
            Ok(None) => {
                eprintln!("battle '{}' disappeared", battle.id);
                return 1;
            }
            Err(err) => {
                eprintln!("failed to read battle: {err}");
                return 1;
            }
        };
        match standings_to_csv(&finished) {
            Ok(csv) => print!("{csv}"),
            Err(err) => {
                eprintln!("failed to export standings: {err}");
                return 1;
            }
        }
    } else {
        match serde_json::to_string_pretty(&report) {
            Ok(payload) => println!("{payload}"),
            Err(err) => {
                eprintln!("failed to serialize simulation report: {err}");
                return 1;
            }
        }
    }

    0
}

fn handle_catalog(args: &[String]) -> i32 {
    let catalog = match args.get(2) {
        Some(path) => match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(err) => {
                eprintln!("catalog validation failed: {err}");
                return 1;
            }
        },
        None => Catalog::builtin(),
    };
    match serde_json::to_string_pretty(&catalog) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize catalog: {err}");
            1
        }
    }
}

/// Arithmetic drill used by `simulate`: twelve questions across all difficulties.
fn demo_battle(teams: u32) -> NewBattle {
    let difficulties = [Some(Difficulty::Easy), Some(Difficulty::Normal), Some(Difficulty::Hard), None];
    let questions = (0..12u32)
        .map(|i| {
            let (a, b) = (i + 2, i * 3 + 1);
            let answer = a * b;
            Question {
                prompt: format!("{a} × {b} = ?"),
                options: vec![
                    answer.to_string(),
                    (answer + 1).to_string(),
                    (answer + a).to_string(),
                    answer.saturating_sub(b).to_string(),
                ],
                correct_index: 0,
                explanation: format!("{a} groups of {b} make {answer}."),
                difficulty: difficulties[i as usize % difficulties.len()],
                source: Some("demo".to_string()),
            }
        })
        .collect();
    NewBattle {
        boss_id: "dragon".to_string(),
        questions,
        teams: (1..=teams)
            .map(|n| TeamEntry::new(format!("team-{n}"), format!("Team {n}"), ""))
            .collect(),
        avg_team_size: None,
    }
}

fn parse_u32_arg(raw: Option<&String>, name: &str, default: u32) -> u32 {
    raw.and_then(|value| value.parse::<u32>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn parse_u64_arg(raw: Option<&String>, name: &str, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
