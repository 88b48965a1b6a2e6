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

//! The atomic counter behind an API Gateway proxy integration:
//! `GET /counter?systemKey=<key>` answers the counter's value before the
//! increment as a bare decimal number. Other methods get a 405, other paths
//! a 404.
//!
//! The table name comes from the `PATTERNS_COUNTER_TABLE` environment variable
//! of the function, or from the embedded configuration.

use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
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
    static ref COUNTER: CounterService<DynamoDbCounterStore> =
        CounterService::new(DynamoDbCounterStore::new(CounterTable::from_config()));
}

async fn handler(event: LambdaEvent<ApiGatewayProxyRequest>) -> Result<Value> {
    let request = event.payload;
    info!(
        "{} {} {:?} on table {}",
        request.http_method,
        request.path.as_deref().unwrap_or("/"),
        request.query_string_parameters.first(SYSTEM_KEY_PARAM),
        COUNTER.store().table().table_name
    );
    Ok(counter_response(&*COUNTER, &request).await.to_json())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    lambda_runtime::run(service_fn(handler)).await?;
    Ok(())
}
