use tpg::engines::graph::{Action, ExecutionContext, Population};
use tpg::engines::program::{Instruction, Mode, Operation, Program};
use tpg::types::{ActionCode, IdAllocator, TeamId};
use tpg::TpgError;

/// Program whose bid is `input[slot]` when registers start at zero
fn reads_slot(ids: &mut IdAllocator, slot: usize) -> Program {
    Program::new(ids, vec![Instruction::new(Mode::Input, Operation::Add, 0, slot)])
}

fn context() -> ExecutionContext {
    ExecutionContext::new(4, false, None, 0)
}

#[test]
fn test_highest_bidder_wins() {
    let mut ids = IdAllocator::new();
    let mut population = Population::new();
    let team = population.create_team(&mut ids, 0);

    let low = reads_slot(&mut ids, 0);
    let high = reads_slot(&mut ids, 1);
    let l1 = population.create_learner(&mut ids, low, Action::Atomic(ActionCode::Discrete(3)), 0);
    let l2 = population.create_learner(&mut ids, high, Action::Atomic(ActionCode::Discrete(7)), 0);
    population.add_learner_to_team(team, l1);
    population.add_learner_to_team(team, l2);

    let mut ctx = context();
    let state = [0.2, 0.9];
    for _ in 0..5 {
        assert_eq!(population.act(team, &state, &mut ctx).unwrap(), ActionCode::Discrete(7));
    }
}

#[test]
fn test_tied_bids_pick_from_the_argmax_set() {
    let mut ids = IdAllocator::new();
    let mut population = Population::new();
    let team = population.create_team(&mut ids, 0);

    for code in [4, 5] {
        let program = reads_slot(&mut ids, 0);
        let learner =
            population.create_learner(&mut ids, program, Action::Atomic(ActionCode::Discrete(code)), 0);
        population.add_learner_to_team(team, learner);
    }

    let mut ctx = context();
    let chosen = population.act(team, &[1.0], &mut ctx).unwrap();
    assert!([ActionCode::Discrete(4), ActionCode::Discrete(5)].contains(&chosen));
}

#[test]
fn test_cycle_without_atomic_exit_is_structural_error() {
    let mut ids = IdAllocator::new();
    let mut population = Population::new();
    let t1 = population.create_team(&mut ids, 0);
    let t2 = population.create_team(&mut ids, 0);
    let t3 = population.create_team(&mut ids, 0);

    for (team, target) in [(t1, t2), (t2, t3), (t3, t1)] {
        let program = reads_slot(&mut ids, 0);
        let learner = population.create_learner(&mut ids, program, Action::Team(target), 0);
        population.add_learner_to_team(team, learner);
    }
    assert!(population.roots().is_empty());

    let mut ctx = context();
    match population.act(t1, &[1.0], &mut ctx) {
        Err(TpgError::StructuralCycle { team, visited }) => {
            assert_eq!(team, t3);
            let mut seen = visited.clone();
            seen.sort();
            assert_eq!(seen, vec![t1, t2, t3]);
        }
        other => panic!("expected a structural cycle, got {:?}", other),
    }
}

#[test]
fn test_visited_team_is_skipped_for_next_best_bid() {
    let mut ids = IdAllocator::new();
    let mut population = Population::new();
    let root = population.create_team(&mut ids, 0);
    let child = population.create_team(&mut ids, 0);

    // root: high bid into child, low bid atomic 1
    let p = reads_slot(&mut ids, 1);
    let into_child = population.create_learner(&mut ids, p, Action::Team(child), 0);
    let p = reads_slot(&mut ids, 0);
    let root_atomic = population.create_learner(&mut ids, p, Action::Atomic(ActionCode::Discrete(1)), 0);
    population.add_learner_to_team(root, into_child);
    population.add_learner_to_team(root, root_atomic);

    // child: high bid back into root, low bid atomic 2
    let p = reads_slot(&mut ids, 1);
    let back = population.create_learner(&mut ids, p, Action::Team(root), 0);
    let p = reads_slot(&mut ids, 0);
    let child_atomic = population.create_learner(&mut ids, p, Action::Atomic(ActionCode::Discrete(2)), 0);
    population.add_learner_to_team(child, back);
    population.add_learner_to_team(child, child_atomic);

    let mut ctx = context();
    assert_eq!(population.act(root, &[0.1, 0.9], &mut ctx).unwrap(), ActionCode::Discrete(2));
}

#[test]
fn test_unknown_team_is_an_error() {
    let population = Population::new();
    let mut ctx = context();
    assert!(matches!(
        population.act(TeamId(42), &[0.0], &mut ctx),
        Err(TpgError::UnknownTeam(TeamId(42)))
    ));
}

#[test]
fn test_bids_are_cached_within_a_frame() {
    let mut ids = IdAllocator::new();
    let mut population = Population::new();
    let root = population.create_team(&mut ids, 0);
    let child = population.create_team(&mut ids, 0);

    let program = reads_slot(&mut ids, 0);
    let shared = population.create_learner(&mut ids, program, Action::Atomic(ActionCode::Discrete(0)), 0);
    let program = reads_slot(&mut ids, 1);
    let descend = population.create_learner(&mut ids, program, Action::Team(child), 0);
    population.add_learner_to_team(root, shared);
    population.add_learner_to_team(root, descend);

    let program = reads_slot(&mut ids, 2);
    let child_best = population.create_learner(&mut ids, program, Action::Atomic(ActionCode::Discrete(9)), 0);
    population.add_learner_to_team(child, shared);
    population.add_learner_to_team(child, child_best);

    // persistent registers: a second run of `shared` in the same frame
    // would double its bid and beat `child_best`
    let mut ctx = ExecutionContext::new(4, true, None, 0);
    assert_eq!(
        population.act(root, &[0.5, 0.9, 0.7], &mut ctx).unwrap(),
        ActionCode::Discrete(9)
    );
}
