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

//! States are elements in your state machine. A state is referred to by its
//! name, which can be any string, but which must be unique within the scope of
//! the entire state machine.
//!
//! States can perform a variety of functions in your state machine:
//!
//! - Do some work in your state machine (a Task state)
//! - Make a choice between branches of execution (a Choice state)
//! - Stop an execution with a failure or success (a Fail or Succeed state)
//! - Simply pass input to its output or inject some fixed data (a Pass state)

use super::paths::ReferencePath;
use serde_json::{json, Map, Value};

/// Transitions link states together, defining the control flow for the state
/// machine. Only one of Next or End can be used in a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The name of the next state.
    Next(String),
    /// Designates this state as a terminal state.
    End,
}

impl Transition {
    /// Creates a transition to the named state.
    pub fn next(name: impl Into<String>) -> Self {
        Transition::Next(name.into())
    }

    fn write_asl(&self, state: &mut Map<String, Value>) {
        match self {
            Transition::Next(name) => state.insert("Next".to_owned(), json!(name)),
            Transition::End => state.insert("End".to_owned(), json!(true)),
        };
    }
}

/// A Task state ("Type": "Task") represents a single unit of work performed by
/// a state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The task handler the state machine invokes.
    pub resource:    String,
    /// Selects the portion of the state input passed to the task.
    pub input_path:  ReferencePath,
    /// Where in the state input the task result is placed.
    pub result_path: ReferencePath,
    /// Where to go once the task completes.
    pub transition:  Transition,
}

impl Task {
    /// Creates a task that passes the whole input to `resource` and replaces
    /// the document with its result.
    pub fn new(resource: impl Into<String>, transition: Transition) -> Self {
        Self {
            resource: resource.into(),
            input_path: ReferencePath::root(),
            result_path: ReferencePath::root(),
            transition,
        }
    }

    /// Sets the InputPath of the task.
    pub fn with_input_path(mut self, path: ReferencePath) -> Self {
        self.input_path = path;
        self
    }

    /// Sets the ResultPath of the task.
    pub fn with_result_path(mut self, path: ReferencePath) -> Self {
        self.result_path = path;
        self
    }
}

/// The comparison a choice rule applies to the selected variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Matches a JSON boolean equal to the operand.
    BooleanEquals(bool),
    /// Matches a JSON string equal to the operand.
    StringEquals(String),
}

/// A Choice Rule: if `variable` satisfies `condition`, go to `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRule {
    /// Path of the inspected value in the state input.
    pub variable:  ReferencePath,
    /// The comparison.
    pub condition: Condition,
    /// The state to transition to when the rule matches.
    pub next:      String,
}

impl ChoiceRule {
    /// Creates a `BooleanEquals` rule.
    pub fn boolean_equals(variable: ReferencePath, value: bool, next: impl Into<String>) -> Self {
        Self {
            variable,
            condition: Condition::BooleanEquals(value),
            next: next.into(),
        }
    }

    /// Creates a `StringEquals` rule.
    pub fn string_equals(
        variable: ReferencePath,
        value: impl Into<String>,
        next: impl Into<String>,
    ) -> Self {
        Self {
            variable,
            condition: Condition::StringEquals(value.into()),
            next: next.into(),
        }
    }

    /// Returns true if the rule matches the document. A missing variable or a
    /// value of another JSON type never matches.
    pub fn matches(&self, doc: &Value) -> bool {
        match (self.variable.select(doc), &self.condition) {
            (Some(Value::Bool(actual)), Condition::BooleanEquals(expected)) => actual == expected,
            (Some(Value::String(actual)), Condition::StringEquals(expected)) => actual == expected,
            _ => false,
        }
    }

    fn to_asl(&self) -> Value {
        let mut rule = Map::new();
        rule.insert("Variable".to_owned(), json!(self.variable));
        match &self.condition {
            Condition::BooleanEquals(b) => rule.insert("BooleanEquals".to_owned(), json!(b)),
            Condition::StringEquals(s) => rule.insert("StringEquals".to_owned(), json!(s)),
        };
        rule.insert("Next".to_owned(), json!(self.next));
        Value::Object(rule)
    }
}

/// A Choice state ("Type": "Choice") adds branching logic to a state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    /// Rules evaluated in order; the first match wins.
    pub choices: Vec<ChoiceRule>,
    /// The name of the state to transition to if none of the rules match.
    pub default: Option<String>,
}

impl Choice {
    /// Creates a choice state without rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule.
    pub fn when(mut self, rule: ChoiceRule) -> Self {
        self.choices.push(rule);
        self
    }

    /// Sets the state taken when no rule matches.
    pub fn otherwise(mut self, next: impl Into<String>) -> Self {
        self.default = Some(next.into());
        self
    }

    /// Returns the name of the next state for the document.
    pub fn next_state(&self, doc: &Value) -> Option<&str> {
        self.choices
            .iter()
            .find(|rule| rule.matches(doc))
            .map(|rule| rule.next.as_str())
            .or(self.default.as_deref())
    }
}

/// A Fail state ("Type": "Fail") stops the execution of the state machine and
/// marks it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fail {
    /// Error name.
    pub error: String,
    /// Human-readable message.
    pub cause: String,
}

/// A Pass state ("Type": "Pass") passes its input to its output, optionally
/// injecting fixed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    /// Fixed result; if absent the state input is the result.
    pub result:      Option<Value>,
    /// Where in the input the result is placed.
    pub result_path: ReferencePath,
    /// Where to go next.
    pub transition:  Transition,
}

/// A Succeed state ("Type": "Succeed") stops an execution successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Succeed {
    /// Selects the execution output from the state input.
    pub output_path: ReferencePath,
}

/// States are represented as fields of the top-level "States" object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// See [`Task`].
    Task(Task),
    /// See [`Choice`].
    Choice(Choice),
    /// See [`Fail`].
    Fail(Fail),
    /// See [`Pass`].
    Pass(Pass),
    /// See [`Succeed`].
    Succeed(Succeed),
}

impl State {
    /// The value of the state's "Type" field.
    pub fn family(&self) -> &'static str {
        match self {
            State::Task(_) => "Task",
            State::Choice(_) => "Choice",
            State::Fail(_) => "Fail",
            State::Pass(_) => "Pass",
            State::Succeed(_) => "Succeed",
        }
    }

    /// Names of the states this state may transition to.
    pub fn successors(&self) -> Vec<&str> {
        match self {
            State::Task(Task { transition, .. }) | State::Pass(Pass { transition, .. }) => {
                match transition {
                    Transition::Next(name) => vec![name.as_str()],
                    Transition::End => vec![],
                }
            }
            State::Choice(choice) => choice
                .choices
                .iter()
                .map(|rule| rule.next.as_str())
                .chain(choice.default.as_deref())
                .collect(),
            State::Fail(_) | State::Succeed(_) => vec![],
        }
    }

    /// Renders the state as an Amazon States Language object.
    pub fn to_asl(&self) -> Value {
        let mut state = Map::new();
        state.insert("Type".to_owned(), json!(self.family()));
        match self {
            State::Task(task) => {
                state.insert("Resource".to_owned(), json!(task.resource));
                state.insert("InputPath".to_owned(), json!(task.input_path));
                state.insert("ResultPath".to_owned(), json!(task.result_path));
                task.transition.write_asl(&mut state);
            }
            State::Choice(choice) => {
                let rules = choice.choices.iter().map(ChoiceRule::to_asl).collect();
                state.insert("Choices".to_owned(), Value::Array(rules));
                if let Some(default) = &choice.default {
                    state.insert("Default".to_owned(), json!(default));
                }
            }
            State::Fail(fail) => {
                state.insert("Error".to_owned(), json!(fail.error));
                state.insert("Cause".to_owned(), json!(fail.cause));
            }
            State::Pass(pass) => {
                if let Some(result) = &pass.result {
                    state.insert("Result".to_owned(), result.clone());
                }
                state.insert("ResultPath".to_owned(), json!(pass.result_path));
                pass.transition.write_asl(&mut state);
            }
            State::Succeed(succeed) => {
                state.insert("OutputPath".to_owned(), json!(succeed.output_path));
            }
        }
        Value::Object(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn choice_rules_match_by_type() -> Result<()> {
        let path = ReferencePath::parse("$.analysis.containsPineapple")?;
        let rule = ChoiceRule::boolean_equals(path.clone(), true, "Reject");

        assert!(rule.matches(&json!({"analysis": {"containsPineapple": true}})));
        assert!(!rule.matches(&json!({"analysis": {"containsPineapple": false}})));
        assert!(!rule.matches(&json!({"analysis": {"containsPineapple": "true"}})));
        assert!(!rule.matches(&json!({"analysis": {}})));

        let rule = ChoiceRule::string_equals(ReferencePath::parse("$.size")?, "large", "Big");
        assert!(rule.matches(&json!({"size": "large"})));
        assert!(!rule.matches(&json!({"size": "small"})));
        Ok(())
    }

    #[test]
    fn choice_falls_back_to_default() -> Result<()> {
        let choice = Choice::new()
            .when(ChoiceRule::boolean_equals(ReferencePath::parse("$.a")?, true, "A"))
            .when(ChoiceRule::boolean_equals(ReferencePath::parse("$.b")?, true, "B"))
            .otherwise("C");

        assert_eq!(choice.next_state(&json!({"a": true, "b": true})), Some("A"));
        assert_eq!(choice.next_state(&json!({"b": true})), Some("B"));
        assert_eq!(choice.next_state(&json!({})), Some("C"));
        assert_eq!(Choice::new().next_state(&json!({})), None);

        let state = State::Choice(choice);
        assert_eq!(state.successors(), vec!["A", "B", "C"]);
        Ok(())
    }

    #[test]
    fn fail_state_asl() {
        let fail = State::Fail(Fail {
            error: "Failed To Make Pizza".to_owned(),
            cause: "They asked for Pineapple".to_owned(),
        });
        assert_eq!(
            fail.to_asl(),
            json!({
                "Type": "Fail",
                "Error": "Failed To Make Pizza",
                "Cause": "They asked for Pineapple"
            })
        );
        assert!(fail.successors().is_empty());
    }
}
