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

//! The pizzeria front door behind an API Gateway proxy integration:
//! `GET /?flavour=<flavour>`.

use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use lambda_runtime::{service_fn, LambdaEvent};
use lazy_static::lazy_static;
use log::{error, info};
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

async fn handler(event: LambdaEvent<ApiGatewayProxyRequest>) -> Result<Value> {
    let request = event.payload;
    let response = match WORKFLOW.as_ref() {
        Ok(workflow) => order_response(workflow, &request),
        Err(e) => {
            error!("Pizzeria workflow is not available: {}", e);
            GatewayResponse::json(500, &serde_json::json!({ "message": "There was an error" }))
        }
    };
    info!(
        "Order {:?} answered {}",
        request.query_string_parameters.first(FLAVOUR_PARAM),
        response.status_code
    );
    Ok(response.to_json())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    lambda_runtime::run(service_fn(handler)).await?;
    Ok(())
}
