//! The phase state machine — restricts which tool operation classes may run
//! during a given handler phase, and latches mutate phases to at most one
//! external mutation.

use sandbox_classify::ClassifiedError;
use serde::{Deserialize, Serialize};

/// Coarse execution mode of the current handler step.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Producing new work: reads and topic publishes are allowed.
    Producer,
    /// Preparing a step: reads and topic peeks are allowed.
    Prepare,
    /// Performing the step's single external mutation.
    Mutate,
    /// Scheduling what comes next: topic publishes are allowed.
    Next,
    /// Outside any handler phase (task mode): everything is allowed.
    Null,
}

/// The class of operation a tool call is classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A side-effect-free read.
    Read,
    /// An external mutation.
    Mutate,
    /// Reading from a topic without consuming it.
    TopicPeek,
    /// Publishing to a topic.
    TopicPublish,
}

/// The constant allow matrix: which operations each phase permits.
///
/// Kept as a `const fn` table rather than computed at runtime.
#[must_use]
pub const fn allowed_ops(phase: Phase) -> &'static [Operation] {
    match phase {
        Phase::Producer => &[Operation::Read, Operation::TopicPublish],
        Phase::Prepare => &[Operation::Read, Operation::TopicPeek],
        Phase::Mutate => &[Operation::Mutate],
        Phase::Next => &[Operation::TopicPublish],
        Phase::Null => &[
            Operation::Read,
            Operation::Mutate,
            Operation::TopicPeek,
            Operation::TopicPublish,
        ],
    }
}

/// The phase controller: current phase plus the single-mutation latch for
/// `Mutate` phases.
///
/// Not behind a lock — one `Sandbox::evaluate` call is exclusive, so a
/// `PhaseController` is only ever touched by one task at a time; an
/// embedding `sandbox-core` caller that needs `Send + Sync` wraps it, rather
/// than this type carrying a lock it doesn't itself need.
#[derive(Debug, Default)]
pub struct PhaseController {
    phase: Phase_,
    mutation_executed: bool,
}

// `Phase` has no meaningful default; track "unset" with a wrapper so
// `PhaseController::default()` starts in `Null` without claiming that was
// explicitly chosen by a caller.
#[derive(Debug, Clone, Copy)]
struct Phase_(Phase);
impl Default for Phase_ {
    fn default() -> Self {
        Self(Phase::Null)
    }
}

impl PhaseController {
    /// Construct a controller starting in the given phase.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase: Phase_(phase),
            mutation_executed: false,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.0
    }

    /// Transition to a new phase. Resets the mutation latch.
    ///
    /// No transition graph is
    /// enforced here — any phase may follow any phase.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = Phase_(phase);
        self.mutation_executed = false;
    }

    /// Check whether `op` is allowed in the current phase, latching a
    /// `Mutate` op so a second one in the same `Mutate` phase is rejected.
    pub fn check(&mut self, op: Operation) -> Result<(), ClassifiedError> {
        if self.phase.0 == Phase::Null {
            return Ok(());
        }
        if !allowed_ops(self.phase.0).contains(&op) {
            return Err(ClassifiedError::logic(format!(
                "Operation '{}' not allowed in '{}' phase",
                debug_lower(op),
                debug_lower_phase(self.phase.0),
            )));
        }
        if op == Operation::Mutate {
            if self.mutation_executed {
                return Err(ClassifiedError::logic(
                    "Operation 'mutate' not allowed: a mutation has already executed in this phase",
                ));
            }
            self.mutation_executed = true;
        }
        Ok(())
    }
}

fn debug_lower(op: Operation) -> String {
    format!("{op:?}").to_lowercase()
}

fn debug_lower_phase(phase: Phase) -> String {
    format!("{phase:?}").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_phase_allows_everything() {
        let mut pc = PhaseController::new(Phase::Null);
        assert!(pc.check(Operation::Mutate).is_ok());
        assert!(pc.check(Operation::Mutate).is_ok());
    }

    #[test]
    fn prepare_phase_rejects_mutate() {
        let mut pc = PhaseController::new(Phase::Prepare);
        let err = pc.check(Operation::Mutate).unwrap_err();
        assert!(matches!(err, ClassifiedError::Logic { .. }));
        assert!(err.message().contains("not allowed"));
    }

    #[test]
    fn mutate_phase_allows_one_mutation_then_rejects_second() {
        let mut pc = PhaseController::new(Phase::Mutate);
        assert!(pc.check(Operation::Mutate).is_ok());
        assert!(pc.check(Operation::Mutate).is_err());
    }

    #[test]
    fn set_phase_resets_the_latch() {
        let mut pc = PhaseController::new(Phase::Mutate);
        assert!(pc.check(Operation::Mutate).is_ok());
        pc.set_phase(Phase::Mutate);
        assert!(pc.check(Operation::Mutate).is_ok());
    }

    #[test]
    fn producer_allows_read_and_topic_publish_only() {
        let mut pc = PhaseController::new(Phase::Producer);
        assert!(pc.check(Operation::Read).is_ok());
        pc.set_phase(Phase::Producer);
        assert!(pc.check(Operation::TopicPublish).is_ok());
        pc.set_phase(Phase::Producer);
        assert!(pc.check(Operation::TopicPeek).is_err());
    }
}
