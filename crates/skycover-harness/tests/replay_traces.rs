//! Replays of recorded visit traces.

use pretty_assertions::assert_eq;
use skycover_core::{DisguiseConfig, DisguiseState, Transition};
use skycover_harness::{TraceAction, TraceStep, parse_trace, replay};

const VISIT: &str = include_str!("fixtures/reveal_browse_exit.jsonl");

fn visit_steps() -> Vec<TraceStep> {
    parse_trace(VISIT).expect("fixture parses")
}

#[test]
fn visit_transitions() {
    let report = replay(DisguiseConfig::default(), 0, &visit_steps()).expect("replay");
    let t = report.transitions();
    assert_eq!(t.len(), 13);
    assert_eq!(t[7], Transition::Revealed);
    assert_eq!(t[9], Transition::Hidden);
    assert_eq!(t[10], Transition::Revealed);
    assert_eq!(t[11], Transition::Exited);
    assert_eq!(t[12], Transition::None);
    assert!(report.final_snapshot.exited);
    assert!(!report.final_snapshot.welcome);
    assert_eq!(report.final_snapshot.state, DisguiseState::Resources);
}

#[test]
fn visit_ends_on_exit_target_with_padded_history() {
    let report = replay(DisguiseConfig::default(), 0, &visit_steps()).expect("replay");
    let (last, earlier) = report.history.split_last().expect("history");
    assert_eq!(last, &report.exit_target);
    assert!(earlier.iter().all(|entry| entry == "/"));
    assert!(
        report
            .effects
            .last()
            .is_some_and(|call| call.starts_with("NavigateReplace"))
    );
}

#[test]
fn same_seed_same_report() {
    let steps = visit_steps();
    let a = replay(DisguiseConfig::default(), 42, &steps).expect("replay");
    let b = replay(DisguiseConfig::default(), 42, &steps).expect("replay");
    assert_eq!(a, b);
    assert_eq!(a.to_jsonl(), b.to_jsonl());
}

#[test]
fn exit_target_always_allow_listed() {
    let allowed = DisguiseConfig::default().exit_targets;
    let steps = [TraceStep::action(0, TraceAction::QuickExit)];
    for seed in 0..32 {
        let report = replay(DisguiseConfig::default(), seed, &steps).expect("replay");
        assert!(allowed.contains(&report.exit_target), "seed {seed}");
    }
}
