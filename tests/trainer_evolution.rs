use std::collections::BTreeSet;
use tpg::config::{AppConfig, InstructionSetKind};
use tpg::engines::evolution::SilentProgressCallback;
use tpg::{ActionCode, ActionSet, Agent, AgentQuery, ScoringMode, TeamId, TpgError, Trainer};

const STATES: [[f64; 3]; 4] = [
    [0.1, 0.5, -0.3],
    [0.9, -0.2, 0.4],
    [-0.7, 0.3, 0.8],
    [0.2, 0.2, 0.2],
];

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.trainer.team_pop_size = 24;
    config.trainer.seed = Some(42);
    config.trainer.actions = ActionSet::Discrete(vec![0, 1, 2]);
    config.program.input_size = 3;
    config.program.register_count = 4;
    config
}

/// Rewards picking the index of the largest input on "largest" and
/// emitting code 0 on "zero".
fn play(agent: &mut Agent<'_>) -> tpg::Result<()> {
    let mut largest = 0.0;
    let mut zero = 0.0;
    for state in &STATES {
        let code = agent.act(state)?;
        let best = state
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
            .0 as i64;
        if code == ActionCode::Discrete(best) {
            largest += 1.0;
        }
        if code == ActionCode::Discrete(0) {
            zero += 1.0;
        }
    }
    agent.reward("largest", largest);
    agent.reward("zero", zero);
    Ok(())
}

fn assert_structure(trainer: &Trainer) {
    let population = trainer.population();
    assert!(population.audit().is_empty(), "{:?}", population.audit());

    for team in population.team_ids() {
        population.assert_team_invariants(team);
    }
    for learner in population.learners() {
        assert!(learner.num_teams_referencing() > 0, "{} is orphaned", learner.id());
    }

    let tracked: BTreeSet<TeamId> = trainer.roots().iter().copied().collect();
    let actual: BTreeSet<TeamId> = population
        .teams()
        .filter(|t| t.num_learners_referencing() == 0)
        .map(|t| t.id())
        .collect();
    assert_eq!(tracked, actual);
}

#[test]
fn test_structure_holds_across_generations() {
    let mut trainer = Trainer::new(test_config()).unwrap();
    assert_structure(&trainer);

    let tasks = vec!["largest".to_string()];
    for generation in 0..6 {
        let evaluated = trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
        assert_eq!(evaluated, 24);

        let summary = trainer.evolve(&tasks, ScoringMode::Single).unwrap();
        assert_eq!(summary.generation, generation);
        assert_eq!(summary.scored, 24);
        assert_eq!(trainer.generation(), generation + 1);
        assert_eq!(trainer.roots().len(), 24);
        for elite in trainer.elites() {
            assert!(trainer.roots().contains(elite));
        }
        assert_structure(&trainer);
    }
}

#[test]
fn test_team_references_evolve_and_traversal_terminates() {
    let mut config = test_config();
    config.mutation.p_action_atomic = 0.3;
    config.mutation.p_learner_mutate = 0.5;
    config.mutation.p_action_mutate = 0.5;
    let mut trainer = Trainer::new(config).unwrap();

    let tasks = vec!["largest".to_string()];
    for _ in 0..8 {
        // `play` propagates any traversal error out of evaluation
        trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
        trainer.evolve(&tasks, ScoringMode::Single).unwrap();
        assert_structure(&trainer);
    }

    let population = trainer.population();
    let pointers = population.learners().filter(|l| !l.is_atomic()).count();
    assert!(pointers > 0);
    assert!(population.team_count() > trainer.roots().len());
    for agent in trainer.agents().iter_mut() {
        for state in &STATES {
            agent.act(state).unwrap();
        }
    }
}

#[test]
fn test_every_scoring_mode_evolves() {
    let modes = [
        ScoringMode::Single,
        ScoringMode::Min,
        ScoringMode::Max,
        ScoringMode::Average,
        ScoringMode::ParetoDominate,
        ScoringMode::ParetoNonDominated,
        ScoringMode::Lexicase,
    ];
    for mode in modes {
        let mut trainer = Trainer::new(test_config()).unwrap();
        for _ in 0..2 {
            trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
            // empty task list: every task reported this generation
            trainer.evolve(&[], mode).unwrap();
            assert_structure(&trainer);
        }
    }
}

#[test]
fn test_team_count_quota_without_root_based_population() {
    let mut config = test_config();
    config.trainer.root_based_population = false;
    let mut trainer = Trainer::new(config).unwrap();
    for _ in 0..3 {
        trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
        let summary = trainer.evolve(&["largest".to_string()], ScoringMode::Average).unwrap();
        assert!(summary.teams >= 24);
        assert_structure(&trainer);
    }
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut trainer = Trainer::new(test_config()).unwrap();
        trainer
            .run(
                3,
                &AgentQuery::default(),
                &["largest".to_string(), "zero".to_string()],
                ScoringMode::Lexicase,
                play,
                SilentProgressCallback,
            )
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_missing_outcome_leaves_population_untouched() {
    let mut trainer = Trainer::new(test_config()).unwrap();
    let first = trainer.roots()[0];
    trainer.report_outcome(first, "largest", 1.0).unwrap();
    let before = trainer.population().team_ids();

    match trainer.evolve(&["largest".to_string()], ScoringMode::Single) {
        Err(TpgError::MissingOutcome { task, .. }) => assert_eq!(task, "largest"),
        other => panic!("expected a missing outcome, got {:?}", other.map(|s| s.generation)),
    }
    assert_eq!(trainer.population().team_ids(), before);
}

#[test]
fn test_outcomes_are_retained_only_for_configured_tasks() {
    let mut config = test_config();
    config.trainer.retained_tasks = vec!["zero".to_string()];
    let mut trainer = Trainer::new(config).unwrap();
    let initial = trainer.roots().to_vec();

    trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
    trainer.evolve(&["largest".to_string()], ScoringMode::Single).unwrap();

    let survivors: Vec<_> = trainer
        .population()
        .teams()
        .filter(|t| initial.contains(&t.id()))
        .collect();
    assert!(!survivors.is_empty());
    for team in survivors {
        assert!(team.outcome("largest").is_none());
        assert!(team.outcome("zero").is_some());
    }

    // agents that already know "zero" report it as done
    let agents = trainer.agents();
    let done = agents.iter().filter(|a| a.is_task_done("zero")).count();
    assert!(done > 0);
    let query = AgentQuery {
        skip_tasks: vec!["zero".to_string()],
        ..Default::default()
    };
    assert_eq!(trainer.get_agents(&query).len(), agents.len() - done);
}

#[test]
fn test_scores_from_another_process_merge() {
    let mut trainer = Trainer::new(test_config()).unwrap();
    let scores: Vec<_> = trainer
        .agents()
        .into_iter()
        .map(|mut agent| {
            agent.reward("largest", agent.team_id().0 as f64);
            agent.into_score()
        })
        .collect();

    let wire = serde_json::to_string(&scores).unwrap();
    let restored: Vec<tpg::AgentScore> = serde_json::from_str(&wire).unwrap();
    trainer.apply_scores(restored).unwrap();

    assert_eq!(trainer.task_names(), vec!["largest".to_string()]);
    let summary = trainer.evolve(&[], ScoringMode::Single).unwrap();
    let best = trainer.roots().iter().map(|t| t.0).max().unwrap();
    assert!(summary.best_fitness <= best as f64);
}

#[test]
fn test_ranked_agents_follow_fitness() {
    let mut trainer = Trainer::new(test_config()).unwrap();
    trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
    trainer.evolve(&["largest".to_string()], ScoringMode::Single).unwrap();

    let query = AgentQuery {
        ranked: true,
        ..Default::default()
    };
    let fitness: Vec<f64> = trainer
        .get_agents(&query)
        .iter()
        .map(|a| {
            trainer
                .population()
                .team(a.team_id())
                .and_then(|t| t.fitness())
                .unwrap_or(f64::NEG_INFINITY)
        })
        .collect();
    assert!(fitness.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_memory_population_evolves() {
    let mut config = test_config();
    config.program.instruction_set = InstructionSetKind::Memory;
    config.program.memory_rows = 10;
    config.program.memory_cols = 4;
    let mut trainer = Trainer::new(config).unwrap();
    assert!(trainer.memory().is_some());

    for _ in 0..2 {
        trainer.evaluate_parallel(&AgentQuery::default(), play).unwrap();
        trainer.evolve(&["largest".to_string()], ScoringMode::Single).unwrap();
        assert_structure(&trainer);
    }
}

#[test]
fn test_invalid_configurations_are_rejected() {
    let mut config = test_config();
    config.trainer.team_pop_size = 0;
    assert!(matches!(Trainer::new(config), Err(TpgError::Configuration(_))));

    let mut config = test_config();
    config.mutation.p_inst_mutate = 0.0;
    assert!(matches!(Trainer::new(config), Err(TpgError::Configuration(_))));

    let mut config = test_config();
    config.trainer.gap = 1.0;
    assert!(matches!(Trainer::new(config), Err(TpgError::Configuration(_))));

    let mut config = test_config();
    config.trainer.actions = ActionSet::Real(vec![vec![0.0, 1.0], vec![1.0]]);
    assert!(matches!(Trainer::new(config), Err(TpgError::Configuration(_))));
}

#[test]
fn test_real_valued_actions() {
    let mut config = test_config();
    config.trainer.actions = ActionSet::Real(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    let trainer = Trainer::new(config).unwrap();
    let mut agents = trainer.agents();
    let code = agents[0].act(&[0.3, 0.1, 0.5]).unwrap();
    assert!(matches!(code, ActionCode::Real(ref v) if v.len() == 2));
}
