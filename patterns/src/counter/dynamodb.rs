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

//! A counter store backed by an Amazon DynamoDB table.

use super::CounterStore;
use crate::aws::dynamodb::{self, number_attribute, number_value, string_attribute, Item};
use crate::configs::{
    counter_table_name, PATTERNS_COUNTER_PARTITION_KEY, PATTERNS_COUNTER_VALUE_ATTR,
    PATTERNS_DYNAMODB_CLIENT,
};
use crate::error::{PatternError, Result};
use async_trait::async_trait;
use rusoto_dynamodb::{DynamoDbClient, GetItemInput, PutItemInput, UpdateItemInput};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

/// Where the counters live: one item per counter, keyed by a string partition
/// key, with the value in a number attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterTable {
    /// The table name.
    pub table_name:      String,
    /// The string partition key holding the counter's identity.
    pub partition_key:   String,
    /// The number attribute holding the counter's value.
    pub value_attribute: String,
}

impl CounterTable {
    /// The table described by the configuration, with the table name
    /// overridable from the environment.
    pub fn from_config() -> Self {
        Self {
            table_name:      counter_table_name(),
            partition_key:   PATTERNS_COUNTER_PARTITION_KEY.to_string(),
            value_attribute: PATTERNS_COUNTER_VALUE_ATTR.to_string(),
        }
    }

    fn key(&self, key: &str) -> Item {
        let mut item = Item::new();
        item.insert(self.partition_key.clone(), string_attribute(key));
        item
    }

    fn names(&self) -> HashMap<String, String> {
        let mut names = HashMap::new();
        names.insert("#k".to_owned(), self.partition_key.clone());
        names.insert("#v".to_owned(), self.value_attribute.clone());
        names
    }

    /// `PutItem` creating the counter unless its key exists.
    pub fn create_request(&self, key: &str, value: u64) -> PutItemInput {
        let mut item = self.key(key);
        item.insert(self.value_attribute.clone(), number_attribute(value));
        let mut names = HashMap::new();
        names.insert("#k".to_owned(), self.partition_key.clone());
        PutItemInput {
            table_name: self.table_name.clone(),
            item,
            condition_expression: Some("attribute_not_exists(#k)".to_owned()),
            expression_attribute_names: Some(names),
            ..Default::default()
        }
    }

    /// `UpdateItem` adding `delta` to an existing counter and returning the
    /// old value.
    pub fn increment_request(&self, key: &str, delta: u64) -> UpdateItemInput {
        let mut values = HashMap::new();
        values.insert(":num".to_owned(), number_attribute(delta));
        UpdateItemInput {
            table_name: self.table_name.clone(),
            key: self.key(key),
            update_expression: Some("SET #v = #v + :num".to_owned()),
            condition_expression: Some("attribute_exists(#k)".to_owned()),
            expression_attribute_names: Some(self.names()),
            expression_attribute_values: Some(values),
            return_values: Some("UPDATED_OLD".to_owned()),
            ..Default::default()
        }
    }

    /// Strongly consistent `GetItem` of the counter.
    pub fn get_request(&self, key: &str) -> GetItemInput {
        GetItemInput {
            table_name: self.table_name.clone(),
            key: self.key(key),
            consistent_read: Some(true),
            ..Default::default()
        }
    }
}

impl Default for CounterTable {
    fn default() -> Self {
        Self::from_config()
    }
}

/// Keeps counters in DynamoDB. Every operation is a single request; the
/// atomicity of increments is DynamoDB's.
#[derive(Clone)]
pub struct DynamoDbCounterStore {
    client: DynamoDbClient,
    table:  CounterTable,
}

impl DynamoDbCounterStore {
    /// Creates a store over `table` using the shared client.
    pub fn new(table: CounterTable) -> Self {
        Self::with_client(PATTERNS_DYNAMODB_CLIENT.clone(), table)
    }

    /// Creates a store over `table` using `client`.
    pub fn with_client(client: DynamoDbClient, table: CounterTable) -> Self {
        Self { client, table }
    }

    /// The table the store works on.
    pub fn table(&self) -> &CounterTable {
        &self.table
    }
}

impl Debug for DynamoDbCounterStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbCounterStore")
            .field("table", &self.table)
            .finish()
    }
}

#[async_trait]
impl CounterStore for DynamoDbCounterStore {
    fn name(&self) -> String {
        "DynamoDbCounterStore".to_string()
    }

    async fn create_if_absent(&self, key: &str, value: u64) -> Result<()> {
        let request = self.table.create_request(key, value);
        if dynamodb::put_item_if(&self.client, request).await? {
            Ok(())
        } else {
            Err(PatternError::AlreadyExists(format!(
                "counter {} in table {}",
                key, self.table.table_name
            )))
        }
    }

    async fn fetch_add(&self, key: &str, delta: u64) -> Result<u64> {
        let request = self.table.increment_request(key, delta);
        match dynamodb::update_item_if(&self.client, request).await? {
            Some(old) => number_value(&old, &self.table.value_attribute),
            None => Err(PatternError::NotFound(format!(
                "counter {} in table {}",
                key, self.table.table_name
            ))),
        }
    }

    async fn load(&self, key: &str) -> Result<Option<u64>> {
        let request = self.table.get_request(key);
        dynamodb::get_item(&self.client, request)
            .await?
            .map(|item| number_value(&item, &self.table.value_attribute))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::CounterService;
    use rusoto_core::Region;
    use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher};

    const CONDITION_FAILED: &str = r#"{
        "__type": "com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException",
        "message": "The conditional request failed"
    }"#;

    const THROTTLED: &str = r#"{
        "__type": "com.amazonaws.dynamodb.v20120810#ProvisionedThroughputExceededException",
        "message": "slow down"
    }"#;

    fn mocked(dispatcher: MockRequestDispatcher) -> DynamoDbCounterStore {
        DynamoDbCounterStore::with_client(
            DynamoDbClient::new_with(dispatcher, MockCredentialsProvider, Region::UsEast1),
            table(),
        )
    }

    fn table() -> CounterTable {
        CounterTable {
            table_name:      "atomicCounter".to_owned(),
            partition_key:   "atomicCounter".to_owned(),
            value_attribute: "counterValue".to_owned(),
        }
    }

    #[test]
    fn create_is_guarded_by_not_exists() {
        let request = table().create_request("system-aa", 1);
        assert_eq!(request.table_name, "atomicCounter");
        assert_eq!(
            request.condition_expression.as_deref(),
            Some("attribute_not_exists(#k)")
        );
        assert_eq!(
            request.item["atomicCounter"].s.as_deref(),
            Some("system-aa")
        );
        assert_eq!(request.item["counterValue"].n.as_deref(), Some("1"));
    }

    #[test]
    fn increment_returns_old_value_of_existing_rows() {
        let request = table().increment_request("system-aa", 1);
        assert_eq!(
            request.update_expression.as_deref(),
            Some("SET #v = #v + :num")
        );
        assert_eq!(
            request.condition_expression.as_deref(),
            Some("attribute_exists(#k)")
        );
        assert_eq!(request.return_values.as_deref(), Some("UPDATED_OLD"));
        let names = request.expression_attribute_names.unwrap();
        assert_eq!(names["#k"], "atomicCounter");
        assert_eq!(names["#v"], "counterValue");
        assert_eq!(
            request.expression_attribute_values.unwrap()[":num"].n.as_deref(),
            Some("1")
        );
    }

    #[test]
    fn reads_are_consistent() {
        assert_eq!(table().get_request("system-aa").consistent_read, Some(true));
    }

    #[tokio::test]
    async fn increment_of_missing_counter_is_not_found() {
        let store = mocked(MockRequestDispatcher::with_status(400).with_body(CONDITION_FAILED));
        assert!(matches!(
            store.fetch_add("system-zz", 1).await,
            Err(PatternError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn initialize_of_existing_counter_is_absorbed() -> Result<()> {
        let store = mocked(MockRequestDispatcher::with_status(400).with_body(CONDITION_FAILED));
        assert!(matches!(
            store.create_if_absent("system-aa", 1).await,
            Err(PatternError::AlreadyExists(_))
        ));
        CounterService::new(store).initialize("system-aa").await
    }

    #[tokio::test]
    async fn increment_decodes_old_value() -> Result<()> {
        let store = mocked(
            MockRequestDispatcher::with_status(200)
                .with_body(r#"{"Attributes": {"counterValue": {"N": "7"}}}"#),
        );
        assert_eq!(CounterService::new(store).increment("system-aa").await?, 7);
        Ok(())
    }

    #[tokio::test]
    async fn throttling_is_unavailable() {
        let store = mocked(MockRequestDispatcher::with_status(400).with_body(THROTTLED));
        match store.fetch_add("system-aa", 1).await {
            Err(PatternError::StoreUnavailable(msg)) => assert_eq!(msg, "slow down"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            store.create_if_absent("system-aa", 1).await,
            Err(PatternError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.load("system-aa").await,
            Err(PatternError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn load_reads_the_item() -> Result<()> {
        let store = mocked(
            MockRequestDispatcher::with_status(200).with_body(
                r#"{"Item": {"atomicCounter": {"S": "system-aa"}, "counterValue": {"N": "3"}}}"#,
            ),
        );
        assert_eq!(store.load("system-aa").await?, Some(3));

        let store = mocked(MockRequestDispatcher::with_status(200).with_body("{}"));
        assert_eq!(store.load("system-zz").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn initialize_then_increment() -> Result<()> {
        let dispatcher = MultipleMockRequestDispatcher::new(vec![
            MockRequestDispatcher::with_status(200).with_body("{}"),
            MockRequestDispatcher::with_status(200)
                .with_body(r#"{"Attributes": {"counterValue": {"N": "1"}}}"#),
        ]);
        let store = DynamoDbCounterStore::with_client(
            DynamoDbClient::new_with(dispatcher, MockCredentialsProvider, Region::UsEast1),
            table(),
        );
        let counter = CounterService::new(store);
        counter.initialize("system-aa").await?;
        assert_eq!(counter.increment("system-aa").await?, 1);
        Ok(())
    }

    #[tokio::test]
    #[ignore]
    async fn live_counter() -> Result<()> {
        let counter = CounterService::new(DynamoDbCounterStore::new(CounterTable::from_config()));
        counter.initialize("system-aa").await?;
        let before = counter.get("system-aa").await?.unwrap().value;
        assert_eq!(counter.increment("system-aa").await?, before);
        assert!(matches!(
            counter.increment("never-initialized").await,
            Err(PatternError::NotFound(_))
        ));
        Ok(())
    }
}
