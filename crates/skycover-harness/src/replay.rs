#![forbid(unsafe_code)]

use core::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::json;
use skycover_core::input::InputEvent;
use skycover_core::{
    ConfigError, DisguiseConfig, DisguiseSession, DisguiseState, RecordingEnvironment,
    SessionSnapshot, Transition,
};

use crate::trace::{TraceAction, TraceStep};

/// Seed for the exit-target draw: `SKYCOVER_SEED`, or `0`.
#[must_use]
pub fn seed_from_env() -> u64 {
    std::env::var("SKYCOVER_SEED")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Outcome of one trace step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub at_ms: u64,
    pub transition: Transition,
    pub state: DisguiseState,
    pub exited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub seed: u64,
    pub exit_target: String,
    pub steps: Vec<StepRecord>,
    /// Effect calls in issue order, debug-formatted.
    pub effects: Vec<String>,
    pub final_snapshot: SessionSnapshot,
    /// History stack left behind, oldest first.
    pub history: Vec<String>,
}

impl ReplayReport {
    #[must_use]
    pub fn transitions(&self) -> Vec<Transition> {
        self.steps.iter().map(|s| s.transition).collect()
    }

    /// Render as JSONL: a `start` line, one `step` line per trace step, one
    /// `effect` line per effect call, and a closing `complete` line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut lines = Vec::with_capacity(self.steps.len() + self.effects.len() + 2);
        lines.push(json!({
            "event": "start",
            "seed": self.seed,
            "exit_target": self.exit_target,
        }));
        for step in &self.steps {
            lines.push(json!({ "event": "step", "record": step }));
        }
        for (index, call) in self.effects.iter().enumerate() {
            lines.push(json!({ "event": "effect", "index": index, "call": call }));
        }
        lines.push(json!({
            "event": "complete",
            "snapshot": self.final_snapshot,
            "history": self.history,
        }));

        let mut out = String::new();
        for line in lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

/// Replay `steps` against a fresh session seeded with `seed`.
pub fn replay(
    config: DisguiseConfig,
    seed: u64,
    steps: &[TraceStep],
) -> Result<ReplayReport, ConfigError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = DisguiseSession::new(config, RecordingEnvironment::default(), &mut rng)?;
    let exit_target = session.exit_target().url().to_string();
    tracing::info!(seed, exit_target = %exit_target, steps = steps.len(), "replay start");

    let mut records = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let now = Duration::from_millis(step.at_ms);
        let transition = match (&step.event, step.action) {
            (Some(event), _) => session.handle(&InputEvent::from(event.clone()), now),
            (None, Some(action)) => apply_action(&mut session, action, now),
            (None, None) => Transition::None,
        };
        tracing::debug!(index, at_ms = step.at_ms, ?transition, "step");
        records.push(StepRecord {
            index,
            at_ms: step.at_ms,
            transition,
            state: session.state(),
            exited: session.is_exited(),
        });
    }

    let last_ms = steps.last().map_or(0, |step| step.at_ms);
    let final_snapshot = session.snapshot(Duration::from_millis(last_ms));
    let env = session.into_env();
    let report = ReplayReport {
        seed,
        exit_target,
        steps: records,
        effects: env.calls().iter().map(|call| format!("{call:?}")).collect(),
        final_snapshot,
        history: env.history().to_vec(),
    };
    tracing::info!(
        effects = report.effects.len(),
        exited = report.final_snapshot.exited,
        "replay complete"
    );
    Ok(report)
}

fn apply_action(
    session: &mut DisguiseSession<RecordingEnvironment>,
    action: TraceAction,
    now: Duration,
) -> Transition {
    match action {
        TraceAction::Close => match session.close() {
            Some(_) => Transition::Hidden,
            None => Transition::None,
        },
        TraceAction::QuickExit => match session.quick_exit() {
            Some(_) => Transition::Exited,
            None => Transition::None,
        },
        TraceAction::ClearHistory => {
            session.clear_history(now);
            Transition::None
        }
        TraceAction::DismissWelcome => {
            session.dismiss_welcome();
            Transition::None
        }
    }
}
