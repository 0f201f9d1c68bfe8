//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Parameter types and the typed values produced by coercion

use crate::HandlerError;
use regex::Regex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Parse function backing a [`CustomType`]
pub type ParseFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync + 'static>;

/// A user supplied primitive conversion
///
/// The parse function must either produce a complete value or fail; there
/// is no partial success.
#[derive(Clone)]
pub struct CustomType {
    name: Arc<str>,
    parse: ParseFn,
}

impl CustomType {
    /// Create a named conversion
    pub fn new<F>(name: impl Into<Arc<str>>, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parse: Arc::new(parse),
        }
    }

    /// Name shown in usage strings and conversion errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the conversion
    pub fn parse(&self, token: &str) -> Result<Value, String> {
        (self.parse)(token)
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Declared type of a command parameter
#[derive(Debug, Clone)]
pub enum ParameterType {
    /// Token passed through unchanged
    String,
    /// Base 10 signed 64 bit integer
    Integer,
    /// 64 bit float
    Float,
    /// `true` or `false`, case insensitive
    Boolean,
    /// Regular expression
    Pattern,
    /// User supplied conversion
    Custom(CustomType),
}

impl ParameterType {
    /// Type name used in usage strings and error messages
    pub fn name(&self) -> &str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::Pattern => "pattern",
            ParameterType::Custom(custom) => custom.name(),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A coerced argument value
#[derive(Debug, Clone)]
pub enum Value {
    /// Unchanged token
    String(String),
    /// Parsed integer
    Integer(i64),
    /// Parsed float
    Float(f64),
    /// Parsed boolean
    Boolean(bool),
    /// Compiled regular expression
    Pattern(Regex),
    /// Value produced by a [`CustomType`]
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap an arbitrary value, for use by custom conversions
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Get the string, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer, if this is an integer value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float, if this is a float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean value
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the regular expression, if this is a pattern value
    pub fn as_pattern(&self) -> Option<&Regex> {
        match self {
            Value::Pattern(re) => Some(re),
            _ => None,
        }
    }

    /// Downcast a custom value
    pub fn as_custom<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Custom(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Pattern(_) => "pattern",
            Value::Custom(_) => "custom",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a.as_str() == b.as_str(),
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Coerced arguments handed to an invoker, in declaration order
///
/// The typed accessors fail with a [`HandlerError`] when the index is out of
/// range or the value has a different type, so invokers can use `?`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    /// Wrap already coerced values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no arguments
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a raw value
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Iterate over the values
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consume into the underlying values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn typed<'a, T>(
        &'a self,
        index: usize,
        wanted: &str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, HandlerError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| HandlerError::new(format!("missing argument {}", index + 1)))?;
        extract(value).ok_or_else(|| {
            HandlerError::new(format!(
                "argument {} is {}, expected {}",
                index + 1,
                value.kind(),
                wanted
            ))
        })
    }

    /// Get a string argument
    pub fn string(&self, index: usize) -> Result<&str, HandlerError> {
        self.typed(index, "string", Value::as_str)
    }

    /// Get an integer argument
    pub fn integer(&self, index: usize) -> Result<i64, HandlerError> {
        self.typed(index, "integer", Value::as_integer)
    }

    /// Get a float argument
    pub fn float(&self, index: usize) -> Result<f64, HandlerError> {
        self.typed(index, "float", Value::as_float)
    }

    /// Get a boolean argument
    pub fn boolean(&self, index: usize) -> Result<bool, HandlerError> {
        self.typed(index, "boolean", Value::as_boolean)
    }

    /// Get a pattern argument
    pub fn pattern(&self, index: usize) -> Result<&Regex, HandlerError> {
        self.typed(index, "pattern", Value::as_pattern)
    }

    /// Get a custom argument
    pub fn custom<T: Any + Send + Sync>(&self, index: usize) -> Result<&T, HandlerError> {
        self.typed(index, std::any::type_name::<T>(), Value::as_custom::<T>)
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
