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

//! Input and Output Processing in Step Functions
//!
//! Individual states receive JSON as input and usually pass JSON as output to
//! the next state. Reference paths select which part of the document a state
//! works on:
//!
//! - InputPath selects which parts of the JSON input to pass to the task.
//! - ResultPath selects what combination of the state input and the task
//!   result to pass to the output.
//! - OutputPath filters the JSON output before it leaves a terminal state.
//!
//! Only the dotted subset of JSONPath (`$`, `$.a.b`) is supported. That is all
//! the patterns need.

use crate::error::{PatternError, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// A reference path: `$` designates the whole document, `$.a.b` the field `b`
/// of the object stored under `a`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReferencePath {
    fields: Vec<String>,
}

impl ReferencePath {
    /// The path designating the entire document.
    pub fn root() -> Self {
        Self { fields: vec![] }
    }

    /// Parses a reference path.
    ///
    /// # Arguments
    /// * `path` - `$` or `$.` followed by dot-separated, non-empty field names.
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path.strip_prefix('$').ok_or_else(|| {
            PatternError::InvalidInput(format!("reference path must start with '$': {}", path))
        })?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let rest = rest.strip_prefix('.').ok_or_else(|| {
            PatternError::InvalidInput(format!("malformed reference path: {}", path))
        })?;
        let fields = rest.split('.').map(str::to_owned).collect::<Vec<_>>();
        if fields.iter().any(|f| f.is_empty()) {
            return Err(PatternError::InvalidInput(format!(
                "empty field in reference path: {}",
                path
            )));
        }
        Ok(Self { fields })
    }

    /// Returns true if the path designates the entire document.
    pub fn is_root(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the value the path designates in `doc`, if any.
    pub fn select<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.fields
            .iter()
            .try_fold(doc, |value, field| value.as_object()?.get(field))
    }

    /// Writes `value` into `doc` at this path and returns the new document.
    ///
    /// Missing intermediate objects are created. The root path replaces the
    /// document altogether.
    pub fn merge(&self, mut doc: Value, value: Value) -> Result<Value> {
        let (last, parents) = match self.fields.split_last() {
            Some(split) => split,
            None => return Ok(value),
        };

        let mut cursor = &mut doc;
        for field in parents {
            cursor = match cursor {
                Value::Object(map) => map
                    .entry(field.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => return Err(self.mismatch()),
            };
        }
        match cursor {
            Value::Object(map) => {
                map.insert(last.clone(), value);
            }
            _ => return Err(self.mismatch()),
        }
        Ok(doc)
    }

    fn mismatch(&self) -> PatternError {
        PatternError::InvalidInput(format!(
            "ResultPath {} cannot be applied to a non-object state input",
            self
        ))
    }
}

impl Display for ReferencePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "$")?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

impl Serialize for ReferencePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_and_display() -> Result<()> {
        assert!(ReferencePath::parse("$")?.is_root());
        assert_eq!(
            ReferencePath::parse("$.pineappleAnalysis.containsPineapple")?.to_string(),
            "$.pineappleAnalysis.containsPineapple"
        );
        assert!(ReferencePath::parse("flavour").is_err());
        assert!(ReferencePath::parse("$flavour").is_err());
        assert!(ReferencePath::parse("$.a..b").is_err());
        Ok(())
    }

    #[test]
    fn select_nested_fields() -> Result<()> {
        let doc = json!({"flavour": {"containsPineapple": true}});
        let path = ReferencePath::parse("$.flavour.containsPineapple")?;
        assert_eq!(path.select(&doc), Some(&json!(true)));
        assert_eq!(ReferencePath::root().select(&doc), Some(&doc));
        assert_eq!(ReferencePath::parse("$.flavour.size")?.select(&doc), None);
        assert_eq!(ReferencePath::parse("$.flavour.containsPineapple.x")?.select(&doc), None);
        Ok(())
    }

    #[test]
    fn merge_creates_missing_objects() -> Result<()> {
        let doc = json!({"flavour": "ham"});
        let merged = ReferencePath::parse("$.analysis.result")?.merge(doc, json!(false))?;
        assert_eq!(merged, json!({"flavour": "ham", "analysis": {"result": false}}));

        let replaced = ReferencePath::root().merge(merged, json!({"only": 1}))?;
        assert_eq!(replaced, json!({"only": 1}));
        Ok(())
    }

    #[test]
    fn merge_into_scalar_fails() -> Result<()> {
        let path = ReferencePath::parse("$.flavour.analysis")?;
        assert!(path.merge(json!({"flavour": "ham"}), json!(1)).is_err());
        assert!(ReferencePath::parse("$.x")?.merge(json!("ham"), json!(1)).is_err());
        Ok(())
    }
}
