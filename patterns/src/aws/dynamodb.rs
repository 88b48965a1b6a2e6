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

//! This crate contains all wrapped functions of the Amazon DynamoDB service.
//!
//! Failures the caller may retry later (throttling, service faults, network
//! and credential problems) become [`PatternError::StoreUnavailable`]; the
//! other failures become [`PatternError::AWS`]. Conditional-check failures are
//! not errors here: the wrappers report them in their return value.

use crate::error::{PatternError, Result};
use log::debug;
use rusoto_core::RusotoError;
use rusoto_dynamodb::{
    AttributeValue, DynamoDb, DynamoDbClient, GetItemError, GetItemInput, PutItemError,
    PutItemInput, UpdateItemError, UpdateItemInput,
};
use std::collections::HashMap;

/// A DynamoDB item or key.
pub type Item = HashMap<String, AttributeValue>;

/// Creates a string attribute (`{"S": value}`).
pub fn string_attribute(value: &str) -> AttributeValue {
    AttributeValue {
        s: Some(value.to_owned()),
        ..Default::default()
    }
}

/// Creates a number attribute (`{"N": value}`).
pub fn number_attribute(value: u64) -> AttributeValue {
    AttributeValue {
        n: Some(value.to_string()),
        ..Default::default()
    }
}

/// Reads the unsigned number attribute `name` of an item.
///
/// # Arguments
/// * `item` - The item or the returned attributes of an update.
/// * `name` - The attribute name.
pub fn number_value(item: &Item, name: &str) -> Result<u64> {
    item.get(name)
        .and_then(|attr| attr.n.as_ref())
        .ok_or_else(|| PatternError::AWS(format!("attribute {} is not a number", name)))?
        .parse::<u64>()
        .map_err(|e| PatternError::AWS(format!("attribute {} is not a u64: {}", name, e)))
}

/// Puts an item if its condition holds.
///
/// # Arguments
/// * `client` - The DynamoDB client.
/// * `request` - The request, usually carrying an `attribute_not_exists`
///   condition.
///
/// # Returns
/// `false` if the condition failed and nothing was written.
pub async fn put_item_if(client: &DynamoDbClient, request: PutItemInput) -> Result<bool> {
    let table = request.table_name.clone();
    match client.put_item(request).await {
        Ok(_) => Ok(true),
        Err(RusotoError::Service(PutItemError::ConditionalCheckFailed(msg))) => {
            debug!("Conditional put on {} skipped: {}", table, msg);
            Ok(false)
        }
        Err(RusotoError::Service(PutItemError::ProvisionedThroughputExceeded(msg)))
        | Err(RusotoError::Service(PutItemError::RequestLimitExceeded(msg)))
        | Err(RusotoError::Service(PutItemError::InternalServerError(msg))) => {
            Err(PatternError::StoreUnavailable(msg))
        }
        Err(e) => Err(classify(e)),
    }
}

/// Updates an item if its condition holds.
///
/// # Arguments
/// * `client` - The DynamoDB client.
/// * `request` - The request, usually carrying an `attribute_exists`
///   condition and a `ReturnValues` setting.
///
/// # Returns
/// The attributes selected by `ReturnValues`, or `None` if the condition
/// failed and nothing was written.
pub async fn update_item_if(
    client: &DynamoDbClient,
    request: UpdateItemInput,
) -> Result<Option<Item>> {
    let table = request.table_name.clone();
    match client.update_item(request).await {
        Ok(output) => Ok(Some(output.attributes.unwrap_or_default())),
        Err(RusotoError::Service(UpdateItemError::ConditionalCheckFailed(msg))) => {
            debug!("Conditional update on {} skipped: {}", table, msg);
            Ok(None)
        }
        Err(RusotoError::Service(UpdateItemError::ProvisionedThroughputExceeded(msg)))
        | Err(RusotoError::Service(UpdateItemError::RequestLimitExceeded(msg)))
        | Err(RusotoError::Service(UpdateItemError::InternalServerError(msg))) => {
            Err(PatternError::StoreUnavailable(msg))
        }
        Err(e) => Err(classify(e)),
    }
}

/// Gets an item.
///
/// # Arguments
/// * `client` - The DynamoDB client.
/// * `request` - The request.
///
/// # Returns
/// The item, or `None` if no item has the key.
pub async fn get_item(client: &DynamoDbClient, request: GetItemInput) -> Result<Option<Item>> {
    match client.get_item(request).await {
        Ok(output) => Ok(output.item),
        Err(RusotoError::Service(GetItemError::ProvisionedThroughputExceeded(msg)))
        | Err(RusotoError::Service(GetItemError::RequestLimitExceeded(msg)))
        | Err(RusotoError::Service(GetItemError::InternalServerError(msg))) => {
            Err(PatternError::StoreUnavailable(msg))
        }
        Err(e) => Err(classify(e)),
    }
}

fn classify<E: std::error::Error + 'static>(e: RusotoError<E>) -> PatternError {
    match &e {
        RusotoError::HttpDispatch(_) | RusotoError::Credentials(_) | RusotoError::Blocking => {
            PatternError::StoreUnavailable(e.to_string())
        }
        RusotoError::Unknown(response) if response.status.is_server_error() => {
            PatternError::StoreUnavailable(e.to_string())
        }
        _ => PatternError::AWS(e.to_string()),
    }
}
