//! Counterexample representation and rendering.
//!
//! When a ring invariant breaks, a counterexample shows the operations that
//! led there, one column per actor (producer, consumer, each reader).

use std::fmt;

/// A counterexample showing the failure path.
#[derive(Debug, Clone)]
pub struct Counterexample {
    /// Buffer state after selected steps
    pub states: Vec<StateSnapshot>,
    /// Operations in execution order
    pub actions: Vec<Action>,
    /// Anomalies observed by readers or the model
    pub anomalies: Vec<Anomaly>,
    /// DST seed for reproduction (if applicable)
    pub dst_seed: Option<u64>,
    /// Human-readable description of the failure
    pub description: Option<String>,
}

/// Snapshot of buffer state at a point in time.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number in the execution
    pub step: u64,
    /// Description of the state
    pub description: String,
    /// Variable values at this point
    pub variables: Vec<(String, String)>,
}

/// Operation performed by one actor.
#[derive(Debug, Clone)]
pub struct Action {
    /// Actor label ("producer", "consumer", "reader-0", ...)
    pub actor: String,
    /// Step number when this action occurred
    pub step: u64,
    /// Description of the action
    pub action: String,
    /// Whether the action produced a result
    pub success: bool,
}

/// Something a reader or the reference model saw that must never happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Reader returned an item that was no longer live (overwritten or removed).
    StaleRead { reader: usize, value: u64, step: u64 },
    /// Reader returned an item older than one it had already returned.
    OutOfOrder {
        reader: usize,
        previous: u64,
        value: u64,
        step: u64,
    },
    /// Buffer count disagrees with the reference model.
    CountMismatch {
        expected: usize,
        actual: usize,
        step: u64,
    },
    /// A fresh traversal did not match the live contents.
    ContentMismatch {
        expected: Vec<u64>,
        actual: Vec<u64>,
        step: u64,
    },
    /// Modification counter did not move the way the operation requires.
    ModCount {
        before: u64,
        after: u64,
        mutated: bool,
        step: u64,
    },
}

impl Counterexample {
    /// Create a new empty counterexample.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            actions: Vec::new(),
            anomalies: Vec::new(),
            dst_seed: None,
            description: None,
        }
    }

    /// Create a counterexample with DST seed for reproduction.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            dst_seed: Some(seed),
            ..Self::new()
        }
    }

    /// Set the description for this counterexample.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a state snapshot. Steps must be increasing.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states.last().map_or(true, |last| state.step > last.step),
            "States must be added in order"
        );
        self.states.push(state);
    }

    /// Add an action.
    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Add an anomaly.
    pub fn add_anomaly(&mut self, anomaly: Anomaly) {
        self.anomalies.push(anomaly);
    }

    /// Render the counterexample as a per-actor step table.
    ///
    /// ```text
    /// DST_SEED=12345
    ///
    /// Step | producer | reader-0 | State
    /// -----|----------|----------|------
    ///    1 | add(1)   |          | count=1
    ///    2 |          | next()=1 | count=1
    /// ```
    #[must_use]
    pub fn render_diagram(&self) -> String {
        let mut output = String::new();

        if let Some(seed) = self.dst_seed {
            output.push_str(&format!("DST_SEED={}\n\n", seed));
        }

        if let Some(ref desc) = self.description {
            output.push_str("Failure: ");
            output.push_str(desc);
            output.push_str("\n\n");
        }

        // Actors in order of first appearance
        let mut actors: Vec<&str> = Vec::new();
        for a in &self.actions {
            if !actors.contains(&a.actor.as_str()) {
                actors.push(&a.actor);
            }
        }

        if actors.is_empty() {
            output.push_str("(no actions recorded)\n");
        } else {
            output.push_str("Step |");
            for actor in &actors {
                output.push_str(&format!(" {} |", actor));
            }
            output.push_str(" State\n");

            output.push_str("-----|");
            for _ in &actors {
                output.push_str("----------|");
            }
            output.push_str("------\n");

            let mut steps: Vec<u64> = self.actions.iter().map(|a| a.step).collect();
            steps.sort_unstable();
            steps.dedup();

            for step in steps {
                output.push_str(&format!("{:4} |", step));
                for actor in &actors {
                    let action = self
                        .actions
                        .iter()
                        .find(|a| a.step == step && a.actor == *actor);
                    match action {
                        Some(a) => {
                            let status = if a.success { "" } else { " [NONE]" };
                            output.push_str(&format!(" {}{} |", a.action, status));
                        }
                        None => output.push_str("          |"),
                    }
                }
                if let Some(state) = self.states.iter().find(|s| s.step == step) {
                    output.push_str(&format!(" {}", state.description));
                }
                output.push('\n');
            }
        }

        if !self.anomalies.is_empty() {
            output.push_str("\nAnomalies:\n");
            for anomaly in &self.anomalies {
                output.push_str(&format!("  - {}\n", anomaly));
            }
        }

        output
    }
}

impl Default for Counterexample {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::StaleRead { reader, value, step } => write!(
                f,
                "Stale read: reader {} returned {} at step {}, which is no longer live",
                reader, value, step
            ),
            Anomaly::OutOfOrder {
                reader,
                previous,
                value,
                step,
            } => write!(
                f,
                "Out of order: reader {} returned {} after {} at step {}",
                reader, value, previous, step
            ),
            Anomaly::CountMismatch {
                expected,
                actual,
                step,
            } => write!(
                f,
                "Count mismatch at step {}: model has {}, buffer reports {}",
                step, expected, actual
            ),
            Anomaly::ContentMismatch {
                expected,
                actual,
                step,
            } => write!(
                f,
                "Content mismatch at step {}: model {:?}, traversal {:?}",
                step, expected, actual
            ),
            Anomaly::ModCount {
                before,
                after,
                mutated,
                step,
            } => write!(
                f,
                "mod_count {} -> {} at step {} (operation mutated: {})",
                before, after, step, mutated
            ),
        }
    }
}
