use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tpg::config::ConfigManager;
use tpg::engines::evolution::ConsoleProgressCallback;
use tpg::{ActionCode, ActionSet, AgentQuery, ScoringMode, Trainer};

const TASK: &str = "largest";
const WIDTH: usize = 4;
const EPISODES: usize = 32;

struct Args {
    config: Option<PathBuf>,
    generations: usize,
    checkpoint: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        generations: 20,
        checkpoint: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--generations" => {
                let value = iter.next().context("--generations needs a value")?;
                args.generations = value.parse().context("--generations must be a number")?;
            }
            "--checkpoint" => {
                args.checkpoint = Some(iter.next().context("--checkpoint needs a path")?.into());
            }
            path => args.config = Some(path.into()),
        }
    }
    Ok(args)
}

/// Toy environment: the agent sees `WIDTH` numbers and should answer with
/// the index of the largest one.
fn largest_index(state: &[f64]) -> i64 {
    state
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0 as i64
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let manager = ConfigManager::new();
    match &args.config {
        Some(path) => manager
            .load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => manager.update(|config| {
            config.trainer.team_pop_size = 60;
            config.trainer.seed = Some(7);
            config.trainer.actions = ActionSet::Discrete((0..WIDTH as i64).collect());
            config.program.input_size = WIDTH;
        })?,
    }
    let config = manager.get()?;

    let mut trainer = match &args.checkpoint {
        Some(path) if path.exists() => Trainer::load_from_file(path)?,
        _ => Trainer::new(config)?,
    };

    let mut rng = StdRng::seed_from_u64(trainer.generation());
    let tasks = vec![TASK.to_string()];
    for _ in 0..args.generations {
        let states: Vec<Vec<f64>> = (0..EPISODES)
            .map(|_| (0..WIDTH).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();

        let summaries = trainer.run(
            1,
            &AgentQuery::default(),
            &tasks,
            ScoringMode::Single,
            |agent| {
                let mut correct = 0;
                for state in &states {
                    if agent.act(state)? == ActionCode::Discrete(largest_index(state)) {
                        correct += 1;
                    }
                }
                agent.reward(TASK, correct as f64 / EPISODES as f64);
                Ok(())
            },
            ConsoleProgressCallback,
        )?;
        log::debug!("{:?}", summaries);
    }

    if let Some(path) = &args.checkpoint {
        trainer
            .save_to_file(path)
            .with_context(|| format!("saving {}", path.display()))?;
    }
    Ok(())
}
