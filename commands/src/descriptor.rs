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

//! Command descriptors and the inputs they are built from

use crate::{Arguments, HandlerError, ParameterType, Result, coerce};
use std::fmt;
use std::sync::Arc;

/// The callable half of a command
///
/// Invokers are synchronous and may block; the service runs them off the
/// I/O threads. Any closure `Fn(&Arguments) -> Result<String, HandlerError>`
/// is an invoker.
///
/// # Example
///
/// ```
/// use telcmd_commands::{Arguments, HandlerError, Invoker};
///
/// struct Echo;
///
/// impl Invoker for Echo {
///     fn invoke(&self, args: &Arguments) -> Result<String, HandlerError> {
///         Ok(args.string(0)?.to_string())
///     }
/// }
/// ```
pub trait Invoker: Send + Sync + 'static {
    /// Run the operation with already coerced arguments
    ///
    /// A handler with nothing to say returns an empty string.
    fn invoke(&self, args: &Arguments) -> std::result::Result<String, HandlerError>;
}

impl<F> Invoker for F
where
    F: Fn(&Arguments) -> std::result::Result<String, HandlerError> + Send + Sync + 'static,
{
    fn invoke(&self, args: &Arguments) -> std::result::Result<String, HandlerError> {
        self(args)
    }
}

/// Declared parameter of a command
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    /// Type driving coercion
    pub param_type: ParameterType,
    /// Zero based position, assigned when the descriptor is built
    pub position: usize,
    /// Display name for usage strings
    pub name: Option<String>,
    /// Free form description
    pub description: Option<String>,
}

impl ParameterSpec {
    /// Create an unnamed parameter of the given type
    pub fn new(param_type: ParameterType) -> Self {
        Self {
            param_type,
            position: 0,
            name: None,
            description: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<ParameterType> for ParameterSpec {
    fn from(param_type: ParameterType) -> Self {
        Self::new(param_type)
    }
}

/// How a command input is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNaming {
    /// Use this name verbatim
    Explicit(String),
    /// Derive the name from this operation name at registry build time
    Derived(String),
}

/// An externally supplied command, before registration
///
/// # Example
///
/// ```
/// use telcmd_commands::{Arguments, CommandInput, ParameterType};
///
/// let add = CommandInput::named("add", |args| {
///     Ok((args.integer(0)? + args.integer(1)?).to_string())
/// })
/// .param(ParameterType::Integer)
/// .param(ParameterType::Integer)
/// .with_description("Add two integers");
/// ```
#[derive(Clone)]
pub struct CommandInput {
    pub(crate) naming: CommandNaming,
    pub(crate) parameters: Vec<ParameterSpec>,
    pub(crate) description: Option<String>,
    pub(crate) invoker: Arc<dyn Invoker>,
}

impl CommandInput {
    /// Create a command with an explicit name
    pub fn named<F>(name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(&Arguments) -> std::result::Result<String, HandlerError> + Send + Sync + 'static,
    {
        Self::new(CommandNaming::Explicit(name.into()), Arc::new(invoker))
    }

    /// Create a command whose name is derived from an operation name
    ///
    /// `doListUsers` becomes `listUsers` under the default `do` prefix.
    pub fn derived<F>(operation: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(&Arguments) -> std::result::Result<String, HandlerError> + Send + Sync + 'static,
    {
        Self::new(CommandNaming::Derived(operation.into()), Arc::new(invoker))
    }

    /// Create a command from a naming rule and a shared [`Invoker`]
    pub fn new(naming: CommandNaming, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            naming,
            parameters: Vec::new(),
            description: None,
            invoker,
        }
    }

    /// Append a parameter
    pub fn param(mut self, param: impl Into<ParameterSpec>) -> Self {
        self.parameters.push(param.into());
        self
    }

    /// Append a named parameter
    pub fn named_param(self, name: impl Into<String>, param_type: ParameterType) -> Self {
        self.param(ParameterSpec::new(param_type).with_name(name))
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the naming rule
    pub fn naming(&self) -> &CommandNaming {
        &self.naming
    }
}

impl fmt::Debug for CommandInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInput")
            .field("naming", &self.naming)
            .field("parameters", &self.parameters)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A registered command
///
/// Immutable once the registry is built.
#[derive(Clone)]
pub struct CommandDescriptor {
    name: String,
    parameters: Vec<ParameterSpec>,
    description: Option<String>,
    invoker: Arc<dyn Invoker>,
}

impl CommandDescriptor {
    pub(crate) fn from_input(name: String, input: CommandInput) -> Self {
        let parameters = input
            .parameters
            .into_iter()
            .enumerate()
            .map(|(position, spec)| ParameterSpec { position, ..spec })
            .collect();

        Self {
            name,
            parameters,
            description: input.description,
            invoker: input.invoker,
        }
    }

    /// Get the command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared parameters in order
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Get the number of declared parameters
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Get the description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Render a one line usage string, e.g. `add <a:integer> <b:integer>`
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for param in &self.parameters {
            match &param.name {
                Some(name) => usage.push_str(&format!(" <{}:{}>", name, param.param_type)),
                None => usage.push_str(&format!(" <{}>", param.param_type)),
            }
        }
        usage
    }

    /// Coerce raw argument text against this command's parameters
    pub fn coerce(&self, raw: &str) -> Result<Arguments> {
        coerce::coerce(&self.name, raw, &self.parameters)
    }

    /// Invoke the handler with coerced arguments
    pub fn invoke(&self, args: &Arguments) -> std::result::Result<String, HandlerError> {
        self.invoker.invoke(args)
    }

    /// Coerce and invoke in one step
    pub fn call(&self, raw: &str) -> Result<String> {
        let args = self.coerce(raw)?;
        Ok(self.invoke(&args)?)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add() -> CommandInput {
        CommandInput::named("add", |args| {
            Ok((args.integer(0)? + args.integer(1)?).to_string())
        })
        .named_param("a", ParameterType::Integer)
        .named_param("b", ParameterType::Integer)
    }

    #[test]
    fn test_positions_assigned() {
        let descriptor = CommandDescriptor::from_input("add".to_string(), add());
        let positions: Vec<usize> = descriptor.parameters().iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(descriptor.arity(), 2);
    }

    #[test]
    fn test_usage() {
        let descriptor = CommandDescriptor::from_input("add".to_string(), add());
        assert_eq!(descriptor.usage(), "add <a:integer> <b:integer>");

        let list = CommandInput::named("list", |_| Ok(String::new()))
            .param(ParameterType::Pattern);
        let descriptor = CommandDescriptor::from_input("list".to_string(), list);
        assert_eq!(descriptor.usage(), "list <pattern>");
    }

    #[test]
    fn test_call() {
        let descriptor = CommandDescriptor::from_input("add".to_string(), add());
        assert_eq!(descriptor.call("2 3").unwrap(), "5");
        assert!(descriptor.call("2").unwrap_err().is_protocol_error());
    }

    #[test]
    fn test_handler_error_passthrough() {
        let input = CommandInput::named("fail", |_| Err(HandlerError::new("nope")));
        let descriptor = CommandDescriptor::from_input("fail".to_string(), input);
        let err = descriptor.call("").unwrap_err();
        assert!(err.is_handler_error());
        assert_eq!(err.to_string(), "nope");
    }
}
