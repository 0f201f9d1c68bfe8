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

//! Command name derivation and validation

use crate::{CommandError, Result};

/// Prefix stripped from operation names by default
pub const DEFAULT_PREFIX: &str = "do";

/// Derive a command name from an operation name
///
/// When `operation` starts with `prefix`, the prefix is stripped and the
/// first remaining character is lower-cased. Operations without the prefix
/// are used verbatim. The resulting name is validated.
///
/// # Example
///
/// ```
/// use telcmd_commands::derive_command_name;
///
/// assert_eq!(derive_command_name("doListUsers", "do").unwrap(), "listUsers");
/// assert_eq!(derive_command_name("status", "do").unwrap(), "status");
/// assert!(derive_command_name("do", "do").is_err());
/// ```
pub fn derive_command_name(operation: &str, prefix: &str) -> Result<String> {
    let name = match operation.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() => {
            let mut chars = rest.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => operation.to_string(),
    };

    if name.is_empty() {
        return Err(CommandError::InvalidCommandName(operation.to_string()));
    }
    validate_command_name(&name)?;
    Ok(name)
}

/// Check that a name can be typed as the first word of a command line
pub fn validate_command_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(CommandError::InvalidCommandName(name.to_string()));
    }
    Ok(())
}
