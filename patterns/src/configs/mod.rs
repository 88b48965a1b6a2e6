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

//! This module provides various default configurations for the patterns.

mod patterns;
pub use self::patterns::PATTERNS_CONF;
use lazy_static::lazy_static;
use rusoto_core::Region;
use rusoto_dynamodb::DynamoDbClient;

/// Environment variable overriding the counter table name, set on the
/// deployed Lambda functions.
pub const PATTERNS_COUNTER_TABLE_ENV: &str = "PATTERNS_COUNTER_TABLE";

lazy_static! {
    /// DynamoDB table holding the counters.
    pub static ref PATTERNS_COUNTER_TABLE: String = PATTERNS_CONF["counter"]["table_name"].to_string();
    /// Partition key attribute of the counter table.
    pub static ref PATTERNS_COUNTER_PARTITION_KEY: String = PATTERNS_CONF["counter"]["partition_key"].to_string();
    /// Numeric attribute holding the counter value.
    pub static ref PATTERNS_COUNTER_VALUE_ATTR: String = PATTERNS_CONF["counter"]["value_attribute"].to_string();
    /// Counter seeded on deployment.
    pub static ref PATTERNS_COUNTER_DEFAULT_KEY: String = PATTERNS_CONF["counter"]["default_key"].to_string();
    /// Value a counter starts from.
    pub static ref PATTERNS_COUNTER_INITIAL_VALUE: u64 = PATTERNS_CONF["counter"]["initial_value"].parse::<u64>().unwrap();
    /// API Gateway resource serving the counter.
    pub static ref PATTERNS_COUNTER_RESOURCE: String = PATTERNS_CONF["counter"]["resource"].to_string();

    /// Step Functions workflow type (`STANDARD` or `EXPRESS`).
    pub static ref PATTERNS_WORKFLOW_TYPE: String = PATTERNS_CONF["workflow"]["machine_type"].to_string();
    /// Step Functions execution timeout.
    pub static ref PATTERNS_WORKFLOW_TIMEOUT: u32 = PATTERNS_CONF["workflow"]["timeout_seconds"].parse::<u32>().unwrap();
    /// Maximum number of state transitions in one execution.
    pub static ref PATTERNS_WORKFLOW_MAX_TRANSITIONS: usize = PATTERNS_CONF["workflow"]["max_transitions"].parse::<usize>().unwrap();
    /// Flavour ordered when the front door gets none.
    pub static ref PATTERNS_DEFAULT_FLAVOUR: String = PATTERNS_CONF["workflow"]["default_flavour"].to_string();

    /// Patterns DynamoDB Client.
    pub static ref PATTERNS_DYNAMODB_CLIENT: DynamoDbClient = DynamoDbClient::new(Region::default());
}

/// Returns the counter table name, preferring the environment of the running
/// function over the embedded configuration.
pub fn counter_table_name() -> String {
    std::env::var(PATTERNS_COUNTER_TABLE_ENV)
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| PATTERNS_COUNTER_TABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_settings() {
        assert_eq!(*PATTERNS_COUNTER_INITIAL_VALUE, 1);
        assert_eq!(*PATTERNS_COUNTER_DEFAULT_KEY, "system-aa");
        assert_eq!(*PATTERNS_WORKFLOW_TIMEOUT, 300);
        assert!(*PATTERNS_WORKFLOW_MAX_TRANSITIONS > 4);
        assert_eq!(*PATTERNS_DEFAULT_FLAVOUR, "pepperoni");
    }
}
