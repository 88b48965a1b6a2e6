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

//! The pizzeria workflow: refuse any order asking for pineapple.
//!
//! ```text
//! Order Pizza Job (Task) ──> With Pineapple? (Choice) ──┬─> Sorry, We Dont add Pineapple (Fail)
//!                                                      └─> Lets make your pizza (Pass, End)
//! ```
//!
//! The first state runs the pineapple check on `$.flavour` and stores its
//! result in `$.pineappleAnalysis`; the choice then looks at
//! `$.pineappleAnalysis.containsPineapple`. Both branches are terminal.

use crate::configs::{PATTERNS_WORKFLOW_TIMEOUT, PATTERNS_WORKFLOW_TYPE};
use crate::error::{PatternError, Result};
use crate::workflow::{
    Choice, ChoiceRule, ExecutionOutcome, Fail, Pass, ReferencePath, State, StateMachine,
    StateMachineType, Task, TaskHandler, Transition,
};
use log::info;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Task state running the pineapple check.
pub const ORDER_PIZZA_JOB: &str = "Order Pizza Job";
/// Choice state branching on the pineapple analysis.
pub const WITH_PINEAPPLE: &str = "With Pineapple?";
/// Fail state for pineapple orders.
pub const PINEAPPLE_DETECTED: &str = "Sorry, We Dont add Pineapple";
/// Pass state for every other order.
pub const COOK_PIZZA: &str = "Lets make your pizza";
/// Resource name of the pineapple check task.
pub const PINEAPPLE_CHECK_RESOURCE: &str = "orderPizza";

/// Error name of a rejected order.
pub const REJECTION_ERROR: &str = "Failed To Make Pizza";
/// Cause of a rejected order, also the [`WorkflowResult::Rejected`] reason.
pub const REJECTION_CAUSE: &str = "They asked for Pineapple";
/// Message of an accepted order.
pub const ACCEPTANCE_MESSAGE: &str = "Lets make your pizza";

const DISALLOWED_INGREDIENT: &str = "pineapple";

/// Result of the pineapple check task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PineappleAnalysis {
    /// Whether the order contains the disallowed ingredient.
    #[serde(rename = "containsPineapple")]
    pub contains_pineapple: bool,
}

/// What the customer asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Flavour {
    /// A free-form topping descriptor such as `"ham & pineapple"`.
    Descriptor(String),
    /// An order already analysed upstream.
    Analysis(PineappleAnalysis),
}

impl Flavour {
    /// Reads a flavour from its JSON form: a non-empty string, or an object
    /// with a boolean `containsPineapple` field.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) if s.trim().is_empty() => Err(PatternError::InvalidInput(
                "flavour must be a non-empty string".to_owned(),
            )),
            Value::String(s) => Ok(Flavour::Descriptor(s.clone())),
            Value::Object(fields) => fields
                .get("containsPineapple")
                .and_then(Value::as_bool)
                .map(|contains_pineapple| {
                    Flavour::Analysis(PineappleAnalysis { contains_pineapple })
                })
                .ok_or_else(|| {
                    PatternError::InvalidInput(
                        "flavour object must carry a boolean containsPineapple".to_owned(),
                    )
                }),
            Value::Null => Err(PatternError::InvalidInput("missing flavour".to_owned())),
            other => Err(PatternError::InvalidInput(format!(
                "unsupported flavour: {}",
                other
            ))),
        }
    }

    /// Checks the flavour is usable.
    pub fn validate(&self) -> Result<()> {
        match self {
            Flavour::Descriptor(s) if s.trim().is_empty() => Err(PatternError::InvalidInput(
                "flavour must be a non-empty string".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    /// The disallowed-ingredient predicate.
    pub fn contains_pineapple(&self) -> bool {
        match self {
            Flavour::Descriptor(s) => s.to_lowercase().contains(DISALLOWED_INGREDIENT),
            Flavour::Analysis(analysis) => analysis.contains_pineapple,
        }
    }
}

/// The input of one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowInput {
    /// The ordered flavour.
    pub flavour: Flavour,
}

impl WorkflowInput {
    /// Creates an input ordering the described flavour.
    pub fn new(flavour: impl Into<String>) -> Self {
        Self {
            flavour: Flavour::Descriptor(flavour.into()),
        }
    }

    /// Reads `{"flavour": ...}`; a missing, null or empty flavour is an
    /// [`PatternError::InvalidInput`].
    pub fn from_json(value: &Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| {
            PatternError::InvalidInput("workflow input must be a JSON object".to_owned())
        })?;
        let flavour = fields.get("flavour").unwrap_or(&Value::Null);
        Ok(Self {
            flavour: Flavour::from_json(flavour)?,
        })
    }
}

/// The outcome of an evaluation. A rejection is a successful evaluation with
/// a negative answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome")]
pub enum WorkflowResult {
    /// The order asked for pineapple.
    Rejected {
        /// Why the order was refused.
        reason: String,
    },
    /// The pizza is being made.
    Accepted {
        /// Message for the customer.
        message: String,
    },
}

impl WorkflowResult {
    /// Returns true for [`WorkflowResult::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, WorkflowResult::Accepted { .. })
    }

    /// The result in the shape of the machine's terminal states:
    /// `{"error", "cause"}` for a rejection, `{"message"}` otherwise.
    pub fn to_json(&self) -> Value {
        match self {
            WorkflowResult::Rejected { reason } => json!({
                "error": REJECTION_ERROR,
                "cause": reason,
            }),
            WorkflowResult::Accepted { message } => json!({ "message": message }),
        }
    }
}

/// The `orderPizza` task: inspects the flavour selected by the task's
/// InputPath and answers `{"containsPineapple": bool}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PineappleCheck;

impl PineappleCheck {
    /// Analyses a flavour.
    pub fn analyse(&self, flavour: &Value) -> Result<PineappleAnalysis> {
        Ok(PineappleAnalysis {
            contains_pineapple: Flavour::from_json(flavour)?.contains_pineapple(),
        })
    }
}

impl TaskHandler for PineappleCheck {
    fn invoke(&self, input: &Value) -> Result<Value> {
        Ok(serde_json::to_value(self.analyse(input)?)?)
    }
}

/// Builds the pizzeria state machine with the configured type and timeout.
pub fn definition() -> Result<StateMachine> {
    definition_with_type(PATTERNS_WORKFLOW_TYPE.parse()?)
}

/// Builds the pizzeria state machine as a workflow of the given type.
pub fn definition_with_type(kind: StateMachineType) -> Result<StateMachine> {
    Ok(StateMachine::new(ORDER_PIZZA_JOB)
        .with_comment("Makes any pizza, as long as it has no pineapple")
        .with_type(kind)
        .with_timeout(*PATTERNS_WORKFLOW_TIMEOUT)
        .with_handler(PINEAPPLE_CHECK_RESOURCE, Arc::new(PineappleCheck))
        .with_state(
            ORDER_PIZZA_JOB,
            State::Task(
                Task::new(PINEAPPLE_CHECK_RESOURCE, Transition::next(WITH_PINEAPPLE))
                    .with_input_path(ReferencePath::parse("$.flavour")?)
                    .with_result_path(ReferencePath::parse("$.pineappleAnalysis")?),
            ),
        )
        .with_state(
            WITH_PINEAPPLE,
            State::Choice(
                Choice::new()
                    .when(ChoiceRule::boolean_equals(
                        ReferencePath::parse("$.pineappleAnalysis.containsPineapple")?,
                        true,
                        PINEAPPLE_DETECTED,
                    ))
                    .otherwise(COOK_PIZZA),
            ),
        )
        .with_state(
            PINEAPPLE_DETECTED,
            State::Fail(Fail {
                error: REJECTION_ERROR.to_owned(),
                cause: REJECTION_CAUSE.to_owned(),
            }),
        )
        .with_state(
            COOK_PIZZA,
            State::Pass(Pass {
                result:      Some(json!(ACCEPTANCE_MESSAGE)),
                result_path: ReferencePath::parse("$.message")?,
                transition:  Transition::End,
            }),
        ))
}

/// The conditional workflow evaluator.
#[derive(Debug, Clone)]
pub struct PizzaWorkflow {
    machine: StateMachine,
}

impl PizzaWorkflow {
    /// Creates an evaluator over the configured pizzeria machine.
    pub fn new() -> Result<Self> {
        Ok(Self {
            machine: definition()?,
        })
    }

    /// The underlying state machine.
    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Evaluates one order.
    pub fn evaluate(&self, input: &WorkflowInput) -> Result<WorkflowResult> {
        input.flavour.validate()?;
        let outcome = self.machine.execute(serde_json::to_value(input)?)?.outcome;
        let result = match outcome {
            ExecutionOutcome::Failed { error, cause } if error == REJECTION_ERROR => {
                WorkflowResult::Rejected { reason: cause }
            }
            ExecutionOutcome::Succeeded { output } => WorkflowResult::Accepted {
                message: output["message"]
                    .as_str()
                    .ok_or("accepted order carries no message")?
                    .to_owned(),
            },
            ExecutionOutcome::Failed { error, cause } => {
                return Err(PatternError::Internal(format!(
                    "unexpected workflow failure {}: {}",
                    error, cause
                )));
            }
        };
        info!("Order {:?} evaluated: {:?}", input.flavour, result);
        Ok(result)
    }

    /// Evaluates a JSON order and answers in the shape of the terminal
    /// states: `{"error", "cause"}` when rejected, the pass-through document
    /// with a `message` when accepted.
    pub fn evaluate_json(&self, input: &Value) -> Result<Value> {
        WorkflowInput::from_json(input)?;
        match self.machine.execute(input.clone())?.outcome {
            ExecutionOutcome::Succeeded { output } => Ok(output),
            ExecutionOutcome::Failed { error, cause } if error == REJECTION_ERROR => {
                Ok(json!({ "error": error, "cause": cause }))
            }
            ExecutionOutcome::Failed { error, cause } => Err(PatternError::Internal(format!(
                "unexpected workflow failure {}: {}",
                error, cause
            ))),
        }
    }
}

/// Evaluates one order against the configured pizzeria machine.
pub fn evaluate(input: &WorkflowInput) -> Result<WorkflowResult> {
    PizzaWorkflow::new()?.evaluate(input)
}

/// Evaluates one JSON order against the configured pizzeria machine.
pub fn evaluate_json(input: &Value) -> Result<Value> {
    PizzaWorkflow::new()?.evaluate_json(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> WorkflowResult {
        WorkflowResult::Rejected {
            reason: "They asked for Pineapple".to_owned(),
        }
    }

    fn accepted() -> WorkflowResult {
        WorkflowResult::Accepted {
            message: "Lets make your pizza".to_owned(),
        }
    }

    #[test]
    fn pineapple_is_rejected() -> Result<()> {
        for flavour in &["pineapple", "Ham & Pineapple", "PINEAPPLE", "extra pineApple"] {
            assert_eq!(evaluate(&WorkflowInput::new(*flavour))?, rejected());
        }
        Ok(())
    }

    #[test]
    fn everything_else_is_accepted() -> Result<()> {
        for flavour in &["pepperoni", "margherita", "pine nuts", "apple"] {
            assert_eq!(evaluate(&WorkflowInput::new(*flavour))?, accepted());
        }
        Ok(())
    }

    #[test]
    fn analysed_orders() -> Result<()> {
        let workflow = PizzaWorkflow::new()?;
        let with = WorkflowInput::from_json(&json!({"flavour": {"containsPineapple": true}}))?;
        let without = WorkflowInput::from_json(&json!({"flavour": {"containsPineapple": false}}))?;
        assert_eq!(workflow.evaluate(&with)?, rejected());
        assert_eq!(workflow.evaluate(&without)?, accepted());
        Ok(())
    }

    #[test]
    fn evaluation_is_pure() -> Result<()> {
        let workflow = PizzaWorkflow::new()?;
        for flavour in &["pineapple", "pepperoni"] {
            let input = WorkflowInput::new(*flavour);
            assert_eq!(workflow.evaluate(&input)?, workflow.evaluate(&input)?);
        }
        Ok(())
    }

    #[test]
    fn malformed_input_is_not_accepted() {
        for input in &[
            json!({}),
            json!({"flavour": null}),
            json!({"flavour": ""}),
            json!({"flavour": "   "}),
            json!({"flavour": {}}),
            json!({"flavour": {"containsPineapple": "yes"}}),
            json!({"flavour": 42}),
            json!("pepperoni"),
        ] {
            assert!(
                matches!(evaluate_json(input), Err(PatternError::InvalidInput(_))),
                "{} should be rejected as invalid input",
                input
            );
        }
        assert!(matches!(
            evaluate(&WorkflowInput::new("")),
            Err(PatternError::InvalidInput(_))
        ));
    }

    #[test]
    fn json_outcomes() -> Result<()> {
        assert_eq!(
            evaluate_json(&json!({"flavour": {"containsPineapple": true}}))?,
            json!({"error": "Failed To Make Pizza", "cause": "They asked for Pineapple"})
        );
        assert_eq!(
            evaluate_json(&json!({"flavour": {"containsPineapple": false, "size": "large"}}))?,
            json!({
                "flavour": {"containsPineapple": false, "size": "large"},
                "pineappleAnalysis": {"containsPineapple": false},
                "message": "Lets make your pizza"
            })
        );
        assert_eq!(rejected().to_json()["cause"], json!("They asked for Pineapple"));
        assert_eq!(accepted().to_json(), json!({"message": "Lets make your pizza"}));
        Ok(())
    }

    #[test]
    fn transition_table() -> Result<()> {
        let machine = definition()?;
        let rejected = machine.execute(json!({"flavour": "pineapple"}))?;
        assert_eq!(
            rejected.history,
            vec![ORDER_PIZZA_JOB, WITH_PINEAPPLE, PINEAPPLE_DETECTED]
        );
        let accepted = machine.execute(json!({"flavour": "pepperoni"}))?;
        assert_eq!(accepted.history, vec![ORDER_PIZZA_JOB, WITH_PINEAPPLE, COOK_PIZZA]);
        assert!(accepted.succeeded());
        Ok(())
    }

    #[test]
    fn renders_asl() -> Result<()> {
        let asl = definition_with_type(StateMachineType::Standard)?.to_asl();
        assert_eq!(asl["StartAt"], json!("Order Pizza Job"));
        assert_eq!(asl["TimeoutSeconds"], json!(300));
        assert_eq!(
            asl["States"]["With Pineapple?"]["Choices"][0]["Variable"],
            json!("$.pineappleAnalysis.containsPineapple")
        );
        assert_eq!(
            asl["States"]["Sorry, We Dont add Pineapple"]["Cause"],
            json!("They asked for Pineapple")
        );
        assert_eq!(asl["States"]["Lets make your pizza"]["End"], json!(true));
        Ok(())
    }
}
