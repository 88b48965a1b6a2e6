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

//! A "prelude" for users of the patterns crate.
//!
//! Like the standard library's prelude, this module simplifies importing of
//! common items. Unlike the standard prelude, the contents of this module must
//! be imported manually:
//!
//! ```
//! use patterns::prelude::*;
//! ```

pub use crate::configs::*;
pub use crate::counter::{
    CounterRecord, CounterService, CounterStore, CounterTable, DynamoDbCounterStore,
    MemoryCounterStore,
};
pub use crate::error::{PatternError, Result};
pub use crate::gateway::{
    counter_path, counter_response, order_response, GatewayResponse, FLAVOUR_PARAM,
    SYSTEM_KEY_PARAM,
};
pub use crate::pizza::{evaluate, evaluate_json, Flavour, PizzaWorkflow, WorkflowInput, WorkflowResult};
pub use crate::workflow::{Execution, ExecutionOutcome, StateMachine, StateMachineType};
