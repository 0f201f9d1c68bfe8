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

//! Command line splitting and argument coercion
//!
//! Arguments are whitespace separated tokens. There is no quoting or
//! escaping: a string argument can never contain whitespace, and a command
//! takes exactly as many tokens as it declares parameters.

use crate::{Arguments, CommandError, ParameterSpec, ParameterType, Result, Value};
use regex::Regex;

/// Split a command line into the command name and the raw argument text
///
/// Leading and trailing whitespace is ignored. Returns `None` for a blank
/// line. The remainder is empty when the line holds only a name.
///
/// # Example
///
/// ```
/// use telcmd_commands::split_command_line;
///
/// assert_eq!(split_command_line("add 2  3"), Some(("add", "2  3")));
/// assert_eq!(split_command_line("  date "), Some(("date", "")));
/// assert_eq!(split_command_line(" \t "), None);
/// ```
pub fn split_command_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => Some((name, rest.trim_start())),
        None => Some((line, "")),
    }
}

/// Split raw argument text into tokens on runs of whitespace
pub fn tokenize(raw: &str) -> Vec<&str> {
    raw.split_whitespace().collect()
}

/// Coerce raw argument text against declared parameters
///
/// Fails with [`CommandError::ArityMismatch`] unless the token count equals
/// the parameter count, and with [`CommandError::TypeConversion`] naming
/// the first token that does not parse. Either every argument converts or
/// none is returned.
pub fn coerce(command: &str, raw: &str, specs: &[ParameterSpec]) -> Result<Arguments> {
    let tokens = tokenize(raw);
    if tokens.len() != specs.len() {
        return Err(CommandError::ArityMismatch {
            command: command.to_string(),
            expected: specs.len(),
            actual: tokens.len(),
        });
    }

    let values = specs
        .iter()
        .zip(tokens)
        .enumerate()
        .map(|(index, (spec, token))| {
            convert(&spec.param_type, token).map_err(|reason| CommandError::TypeConversion {
                index,
                token: token.to_string(),
                expected: spec.param_type.name().to_string(),
                reason,
            })
        })
        .collect::<Result<Vec<Value>>>()?;

    Ok(Arguments::new(values))
}

/// Convert a single token to a value of the given type
pub fn convert(param_type: &ParameterType, token: &str) -> std::result::Result<Value, String> {
    match param_type {
        ParameterType::String => Ok(Value::String(token.to_string())),
        ParameterType::Integer => token
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| e.to_string()),
        ParameterType::Float => match token.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            Ok(_) => Err("value is not finite".to_string()),
            Err(e) => Err(e.to_string()),
        },
        ParameterType::Boolean => {
            if token.eq_ignore_ascii_case("true") {
                Ok(Value::Boolean(true))
            } else if token.eq_ignore_ascii_case("false") {
                Ok(Value::Boolean(false))
            } else {
                Err("expected true or false".to_string())
            }
        }
        ParameterType::Pattern => Regex::new(token)
            .map(Value::Pattern)
            .map_err(|e| first_line(&e.to_string())),
        ParameterType::Custom(custom) => custom.parse(token),
    }
}

// Regex errors render as multi-line diagrams; clients get one line.
fn first_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .rfind(|line| line.starts_with("error:"))
        .or_else(|| message.lines().next())
        .unwrap_or_default()
        .to_string()
}
