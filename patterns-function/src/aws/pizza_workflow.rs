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

//! Runs the whole pizzeria workflow synchronously on the invocation payload
//! `{"flavour": ...}`.
//!
//! A pineapple order answers `{"error", "cause"}`, any other order the
//! pass-through document with its `message`. Malformed orders fail the
//! invocation.

use lambda_runtime::{service_fn, LambdaEvent};
use lazy_static::lazy_static;
use log::info;
use patterns::prelude::*;
use serde_json::Value;

#[cfg(feature = "snmalloc")]
#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

lazy_static! {
    static ref WORKFLOW: Result<PizzaWorkflow> = PizzaWorkflow::new();
}

async fn handler(event: LambdaEvent<Value>) -> Result<Value> {
    let workflow = WORKFLOW
        .as_ref()
        .map_err(|e| PatternError::Internal(e.to_string()))?;
    let output = workflow.evaluate_json(&event.payload)?;
    info!("Request {}: {}", event.context.request_id, output);
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    lambda_runtime::run(service_fn(handler)).await?;
    Ok(())
}
