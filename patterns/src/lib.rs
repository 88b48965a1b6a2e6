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

#![warn(missing_docs, clippy::needless_borrow)]
// Clippy lints, some should be disabled incrementally
#![allow(
    clippy::module_inception,
    clippy::new_without_default,
    clippy::upper_case_acronyms
)]

//! Serverless patterns on cloud function services: a Step Functions-style
//! conditional workflow that refuses pineapple pizzas, and an atomic counter
//! backed by DynamoDB and served through API Gateway.

pub mod aws;
pub mod configs;
pub mod counter;
pub mod error;
pub mod gateway;
pub mod pizza;
pub mod prelude;
pub mod workflow;
