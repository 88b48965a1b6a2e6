// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! You create a workflow that runs a group of tasks (steps) in a specific
//! order. One task's output passes to the next task's input. The last step in
//! your workflow gives a result.
//!
//! The interpreter here runs a definition in-process, once per invocation:
//! there are no retries, no waits and no parallel branches.

use super::paths::ReferencePath;
use super::states::{State, Transition};
use crate::configs::PATTERNS_WORKFLOW_MAX_TRANSITIONS;
use crate::error::{PatternError, Result};
use log::debug;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// The error name of a Choice state without a matching rule or a default.
pub const NO_CHOICE_MATCHED: &str = "States.NoChoiceMatched";

/// A unit of work a Task state delegates to, e.g. a Lambda function.
///
/// Handlers are registered on the state machine under the task's resource
/// name. Errors returned by a handler abort the execution and are returned to
/// the caller unchanged.
pub trait TaskHandler: Debug + Send + Sync {
    /// Runs the task on the input selected by the state's InputPath.
    fn invoke(&self, input: &Value) -> Result<Value>;
}

/// Step Functions workflow type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMachineType {
    /// Exactly-once, long-running workflows.
    Standard,
    /// At-least-once, high-volume, short-lived workflows.
    Express,
}

impl Display for StateMachineType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StateMachineType::Standard => write!(f, "STANDARD"),
            StateMachineType::Express => write!(f, "EXPRESS"),
        }
    }
}

impl FromStr for StateMachineType {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(StateMachineType::Standard),
            "EXPRESS" => Ok(StateMachineType::Express),
            _ => Err(PatternError::InvalidInput(format!(
                "unknown state machine type: {}",
                s
            ))),
        }
    }
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// A Succeed state, or a Task/Pass state with `End`, was reached.
    Succeeded {
        /// The execution output.
        output: Value,
    },
    /// A Fail state was reached, or a Choice state had nowhere to go.
    Failed {
        /// Error name.
        error: String,
        /// Human-readable message.
        cause: String,
    },
}

/// The record of one run of a state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Names of the visited states, in order.
    pub history: Vec<String>,
    /// How the execution ended.
    pub outcome: ExecutionOutcome,
}

impl Execution {
    /// Returns true if the execution succeeded.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Succeeded { .. })
    }
}

/// A State Machine definition plus the task handlers needed to run it.
///
/// The operation of a state machine is specified by states, which are
/// represented by JSON objects, fields in the top-level "States" object.
#[derive(Debug, Clone)]
pub struct StateMachine {
    /// Human-readable description of the machine.
    pub comment:         Option<String>,
    /// The state the interpreter starts running the machine at.
    pub start_at:        String,
    /// The states, keyed by name.
    pub states:          BTreeMap<String, State>,
    /// Maximum number of seconds an execution may run.
    pub timeout_seconds: u32,
    /// Standard or Express workflow.
    pub kind:            StateMachineType,
    handlers:            HashMap<String, Arc<dyn TaskHandler>>,
    max_transitions:     usize,
}

impl StateMachine {
    /// Creates an empty machine starting at `start_at`.
    pub fn new(start_at: impl Into<String>) -> Self {
        Self {
            comment: None,
            start_at: start_at.into(),
            states: BTreeMap::new(),
            timeout_seconds: 300,
            kind: StateMachineType::Standard,
            handlers: HashMap::new(),
            max_transitions: *PATTERNS_WORKFLOW_MAX_TRANSITIONS,
        }
    }

    /// Sets the machine comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the execution timeout.
    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the workflow type.
    pub fn with_type(mut self, kind: StateMachineType) -> Self {
        self.kind = kind;
        self
    }

    /// Caps the number of state transitions per execution.
    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.max_transitions = max_transitions;
        self
    }

    /// Adds a state.
    pub fn with_state(mut self, name: impl Into<String>, state: State) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    /// Registers the handler run by Task states whose resource is `resource`.
    pub fn with_handler(
        mut self,
        resource: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        self.handlers.insert(resource.into(), handler);
        self
    }

    /// Checks that the start state and every transition target exist, and
    /// that every task has a handler.
    pub fn validate(&self) -> Result<()> {
        if !self.states.contains_key(&self.start_at) {
            return Err(PatternError::InvalidInput(format!(
                "StartAt state {} is not defined",
                self.start_at
            )));
        }
        for (name, state) in &self.states {
            if let Some(target) = state
                .successors()
                .into_iter()
                .find(|next| !self.states.contains_key(*next))
            {
                return Err(PatternError::InvalidInput(format!(
                    "state {} transitions to undefined state {}",
                    name, target
                )));
            }
            if let State::Task(task) = state {
                if !self.handlers.contains_key(&task.resource) {
                    return Err(PatternError::NotImplemented(format!(
                        "no handler registered for resource {}",
                        task.resource
                    )));
                }
            }
        }
        Ok(())
    }

    /// Runs the machine once on `input`.
    ///
    /// Reaching a Fail state is a normal outcome, reported in the returned
    /// [`Execution`]. Errors raised by task handlers or by path processing
    /// abort the run and are returned as is.
    pub fn execute(&self, input: Value) -> Result<Execution> {
        self.validate()?;

        let mut history = Vec::new();
        let mut document = input;
        let mut name: &str = &self.start_at;

        loop {
            if history.len() >= self.max_transitions {
                return Err(PatternError::Internal(format!(
                    "execution exceeded {} state transitions",
                    self.max_transitions
                )));
            }
            let state = self.states.get(name).ok_or_else(|| {
                PatternError::Internal(format!("state {} vanished from the machine", name))
            })?;
            history.push(name.to_owned());
            debug!("Entering {} state: {}", state.family(), name);

            let transition = match state {
                State::Task(task) => {
                    let handler = self.handlers.get(&task.resource).ok_or_else(|| {
                        PatternError::NotImplemented(format!(
                            "no handler registered for resource {}",
                            task.resource
                        ))
                    })?;
                    let task_input = select(&task.input_path, &document, "InputPath")?;
                    let result = handler.invoke(task_input)?;
                    document = task.result_path.merge(document, result)?;
                    &task.transition
                }
                State::Pass(pass) => {
                    let result = pass.result.clone().unwrap_or_else(|| document.clone());
                    document = pass.result_path.merge(document, result)?;
                    &pass.transition
                }
                State::Choice(choice) => match choice.next_state(&document) {
                    Some(next) => {
                        name = next;
                        continue;
                    }
                    None => {
                        return Ok(Execution {
                            history,
                            outcome: ExecutionOutcome::Failed {
                                error: NO_CHOICE_MATCHED.to_owned(),
                                cause: format!("no choice rule of {} matched the input", name),
                            },
                        });
                    }
                },
                State::Fail(fail) => {
                    return Ok(Execution {
                        history,
                        outcome: ExecutionOutcome::Failed {
                            error: fail.error.clone(),
                            cause: fail.cause.clone(),
                        },
                    });
                }
                State::Succeed(succeed) => {
                    let output = select(&succeed.output_path, &document, "OutputPath")?.clone();
                    return Ok(Execution {
                        history,
                        outcome: ExecutionOutcome::Succeeded { output },
                    });
                }
            };

            match transition {
                Transition::Next(next) => name = next.as_str(),
                Transition::End => {
                    return Ok(Execution {
                        history,
                        outcome: ExecutionOutcome::Succeeded { output: document },
                    });
                }
            }
        }
    }

    /// Renders the definition as Amazon States Language.
    pub fn to_asl(&self) -> Value {
        let mut machine = Map::new();
        if let Some(comment) = &self.comment {
            machine.insert("Comment".to_owned(), json!(comment));
        }
        machine.insert("StartAt".to_owned(), json!(self.start_at));
        machine.insert("TimeoutSeconds".to_owned(), json!(self.timeout_seconds));
        machine.insert(
            "States".to_owned(),
            Value::Object(
                self.states
                    .iter()
                    .map(|(name, state)| (name.clone(), state.to_asl()))
                    .collect(),
            ),
        );
        Value::Object(machine)
    }
}

fn select<'a>(path: &ReferencePath, doc: &'a Value, field: &str) -> Result<&'a Value> {
    path.select(doc).ok_or_else(|| {
        PatternError::InvalidInput(format!(
            "{} {} selected nothing from the state input",
            field, path
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::states::{Choice, ChoiceRule, Fail, Pass, Succeed, Task};

    #[derive(Debug)]
    struct Double;

    impl TaskHandler for Double {
        fn invoke(&self, input: &Value) -> Result<Value> {
            input
                .as_u64()
                .map(|n| json!(n * 2))
                .ok_or_else(|| PatternError::InvalidInput("expected a number".to_owned()))
        }
    }

    fn doubling_machine() -> Result<StateMachine> {
        Ok(StateMachine::new("Double")
            .with_handler("double", Arc::new(Double))
            .with_state(
                "Double",
                State::Task(
                    Task::new("double", Transition::next("Big?"))
                        .with_input_path(ReferencePath::parse("$.n")?)
                        .with_result_path(ReferencePath::parse("$.doubled")?),
                ),
            )
            .with_state(
                "Big?",
                State::Choice(
                    Choice::new()
                        .when(ChoiceRule::boolean_equals(
                            ReferencePath::parse("$.big")?,
                            true,
                            "TooBig",
                        ))
                        .otherwise("Done"),
                ),
            )
            .with_state(
                "TooBig",
                State::Fail(Fail {
                    error: "Overflow".to_owned(),
                    cause: "too big".to_owned(),
                }),
            )
            .with_state(
                "Done",
                State::Succeed(Succeed {
                    output_path: ReferencePath::parse("$.doubled")?,
                }),
            ))
    }

    #[test]
    fn runs_to_succeed() -> Result<()> {
        let execution = doubling_machine()?.execute(json!({"n": 21}))?;
        assert_eq!(execution.history, vec!["Double", "Big?", "Done"]);
        assert_eq!(
            execution.outcome,
            ExecutionOutcome::Succeeded { output: json!(42) }
        );
        Ok(())
    }

    #[test]
    fn runs_to_fail() -> Result<()> {
        let execution = doubling_machine()?.execute(json!({"n": 1, "big": true}))?;
        assert!(!execution.succeeded());
        assert_eq!(execution.history, vec!["Double", "Big?", "TooBig"]);
        assert_eq!(
            execution.outcome,
            ExecutionOutcome::Failed {
                error: "Overflow".to_owned(),
                cause: "too big".to_owned(),
            }
        );
        Ok(())
    }

    #[test]
    fn task_errors_abort_the_execution() -> Result<()> {
        let machine = doubling_machine()?;
        assert!(matches!(
            machine.execute(json!({"n": "ten"})),
            Err(PatternError::InvalidInput(_))
        ));
        assert!(matches!(
            machine.execute(json!({"m": 1})),
            Err(PatternError::InvalidInput(_))
        ));
        Ok(())
    }

    #[test]
    fn choice_without_default_fails_the_execution() -> Result<()> {
        let machine = StateMachine::new("Pick")
            .with_state(
                "Pick",
                State::Choice(Choice::new().when(ChoiceRule::string_equals(
                    ReferencePath::parse("$.size")?,
                    "large",
                    "Done",
                ))),
            )
            .with_state(
                "Done",
                State::Succeed(Succeed {
                    output_path: ReferencePath::root(),
                }),
            );
        let execution = machine.execute(json!({"size": "small"}))?;
        match execution.outcome {
            ExecutionOutcome::Failed { error, .. } => assert_eq!(error, NO_CHOICE_MATCHED),
            other => panic!("unexpected outcome: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn cycles_are_cut_off() {
        let machine = StateMachine::new("Ping")
            .with_max_transitions(10)
            .with_state(
                "Ping",
                State::Pass(Pass {
                    result:      None,
                    result_path: ReferencePath::root(),
                    transition:  Transition::next("Pong"),
                }),
            )
            .with_state(
                "Pong",
                State::Pass(Pass {
                    result:      None,
                    result_path: ReferencePath::root(),
                    transition:  Transition::next("Ping"),
                }),
            );
        assert!(matches!(
            machine.execute(json!({})),
            Err(PatternError::Internal(_))
        ));
    }

    #[test]
    fn validate_rejects_dangling_transitions() {
        let machine = StateMachine::new("Start").with_state(
            "Start",
            State::Pass(Pass {
                result:      Some(json!("x")),
                result_path: ReferencePath::root(),
                transition:  Transition::next("Nowhere"),
            }),
        );
        assert!(machine.validate().is_err());
        assert!(StateMachine::new("Missing").validate().is_err());

        let no_handler = StateMachine::new("Work")
            .with_state("Work", State::Task(Task::new("absent", Transition::End)));
        assert!(matches!(
            no_handler.validate(),
            Err(PatternError::NotImplemented(_))
        ));
    }

    #[test]
    fn renders_asl() -> Result<()> {
        let asl = doubling_machine()?
            .with_comment("doubles numbers")
            .with_timeout(60)
            .to_asl();
        assert_eq!(asl["StartAt"], json!("Double"));
        assert_eq!(asl["TimeoutSeconds"], json!(60));
        assert_eq!(asl["Comment"], json!("doubles numbers"));
        assert_eq!(asl["States"]["Double"]["InputPath"], json!("$.n"));
        assert_eq!(asl["States"]["Double"]["Next"], json!("Big?"));
        assert_eq!(asl["States"]["Big?"]["Default"], json!("Done"));
        assert_eq!(asl["States"]["Done"]["Type"], json!("Succeed"));
        Ok(())
    }

    #[test]
    fn parses_machine_type() -> Result<()> {
        assert_eq!("express".parse::<StateMachineType>()?, StateMachineType::Express);
        assert_eq!(StateMachineType::Standard.to_string(), "STANDARD");
        assert!("sync".parse::<StateMachineType>().is_err());
        Ok(())
    }
}
