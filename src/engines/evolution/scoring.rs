//! Fitness assignment for root teams from their per-task outcomes.
//!
//! Every scorer takes an outcome matrix (one row per team, one column per
//! task) and returns one fitness per row; higher is better.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Outcome of the first task, unchanged
    Single,
    /// Worst normalized task score
    Min,
    /// Best normalized task score
    Max,
    /// Mean normalized task score
    Average,
    /// Number of other teams this one weakly dominates on every task
    ParetoDominate,
    /// Minus the number of teams that beat this one on every task
    ParetoNonDominated,
    /// Rank under a lexicographic order over a shuffled task sequence
    Lexicase,
}

pub fn score<R: Rng>(outcomes: &[Vec<f64>], mode: ScoringMode, rng: &mut R) -> Vec<f64> {
    match mode {
        ScoringMode::Single => outcomes
            .iter()
            .map(|row| row.first().copied().unwrap_or(0.0))
            .collect(),
        ScoringMode::Min => aggregate(&normalize(outcomes), |row| {
            row.iter().copied().fold(f64::INFINITY, f64::min)
        }),
        ScoringMode::Max => aggregate(&normalize(outcomes), |row| {
            row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        }),
        ScoringMode::Average => aggregate(&normalize(outcomes), |row| {
            row.iter().sum::<f64>() / row.len().max(1) as f64
        }),
        ScoringMode::ParetoDominate => pareto_dominate(outcomes),
        ScoringMode::ParetoNonDominated => pareto_non_dominated(outcomes),
        ScoringMode::Lexicase => {
            let tasks = outcomes.first().map_or(0, |row| row.len());
            let mut order: Vec<usize> = (0..tasks).collect();
            order.shuffle(rng);
            lexicase(outcomes, &order)
        }
    }
}

/// Rescale each task column to [0, 1] by its population min/max.
/// A column without spread maps to 1.0 so it neither helps nor hurts.
pub fn normalize(outcomes: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let tasks = outcomes.first().map_or(0, |row| row.len());
    let bounds: Vec<(f64, f64)> = (0..tasks)
        .map(|k| {
            outcomes.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), row| {
                (lo.min(row[k]), hi.max(row[k]))
            })
        })
        .collect();

    outcomes
        .iter()
        .map(|row| {
            row.iter()
                .zip(&bounds)
                .map(|(&value, &(lo, hi))| {
                    let range = hi - lo;
                    if range.abs() < 1e-12 {
                        1.0
                    } else {
                        (value - lo) / range
                    }
                })
                .collect()
        })
        .collect()
}

fn aggregate<F: Fn(&[f64]) -> f64>(rows: &[Vec<f64>], f: F) -> Vec<f64> {
    rows.iter().map(|row| f(row)).collect()
}

/// `a` is at least as good as `b` on every task
pub fn weakly_dominates(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x >= y)
}

/// `a` is strictly better than `b` on every task
pub fn strictly_dominates(a: &[f64], b: &[f64]) -> bool {
    !a.is_empty() && a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x > y)
}

pub fn pareto_dominate(outcomes: &[Vec<f64>]) -> Vec<f64> {
    (0..outcomes.len())
        .map(|i| {
            (0..outcomes.len())
                .filter(|&j| j != i && weakly_dominates(&outcomes[i], &outcomes[j]))
                .count() as f64
        })
        .collect()
}

pub fn pareto_non_dominated(outcomes: &[Vec<f64>]) -> Vec<f64> {
    (0..outcomes.len())
        .map(|i| {
            let beaten_by = (0..outcomes.len())
                .filter(|&j| j != i && strictly_dominates(&outcomes[j], &outcomes[i]))
                .count();
            -(beaten_by as f64)
        })
        .collect()
}

/// Sort teams by their outcomes on `order[0]`, breaking ties with
/// `order[1]`, and so on. Fitness is `n - rank`; identical rows share a rank.
pub fn lexicase(outcomes: &[Vec<f64>], order: &[usize]) -> Vec<f64> {
    let n = outcomes.len();
    let compare = |a: usize, b: usize| -> Ordering {
        for &task in order {
            match outcomes[b][task].partial_cmp(&outcomes[a][task]) {
                Some(Ordering::Equal) | None => continue,
                Some(other) => return other,
            }
        }
        Ordering::Equal
    };

    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&a, &b| compare(a, b));

    let mut fitness = vec![0.0; n];
    let mut rank = 0;
    for (pos, &idx) in ranked.iter().enumerate() {
        if pos > 0 && compare(ranked[pos - 1], idx) != Ordering::Equal {
            rank = pos;
        }
        fitness[idx] = (n - rank) as f64;
    }
    fitness
}

/// Row index of the best raw outcome for each task, deduplicated
pub fn elites(outcomes: &[Vec<f64>]) -> Vec<usize> {
    let tasks = outcomes.first().map_or(0, |row| row.len());
    let mut best = Vec::new();
    for k in 0..tasks {
        let winner = (0..outcomes.len()).max_by(|&a, &b| {
            outcomes[a][k]
                .partial_cmp(&outcomes[b][k])
                .unwrap_or(Ordering::Equal)
                // prefer the earlier row on ties
                .then(b.cmp(&a))
        });
        if let Some(idx) = winner {
            if !best.contains(&idx) {
                best.push(idx);
            }
        }
    }
    best
}
