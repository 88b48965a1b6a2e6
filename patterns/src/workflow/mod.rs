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

//! Step Functions is a serverless orchestration service that lets you combine
//! AWS Lambda functions and other AWS services to build business-critical
//! applications. Workflows are defined in the Amazon States Language
//! (https://states-language.net/) as a set of states, each of which can make
//! decisions based on its input, perform actions, and pass output to other
//! states.
//!
//! This module is a small in-process interpreter for the part of the language
//! used by the patterns: Task, Choice, Fail, Pass and Succeed states with
//! dotted reference paths. A definition built here can also be rendered as
//! Amazon States Language with [`StateMachine::to_asl`].

pub mod machine;
pub use machine::{
    Execution, ExecutionOutcome, StateMachine, StateMachineType, TaskHandler, NO_CHOICE_MATCHED,
};

pub mod paths;
pub use paths::ReferencePath;

pub mod states;
pub use states::{Choice, ChoiceRule, Condition, Fail, Pass, State, Succeed, Task, Transition};
