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

//! Command registry
//!
//! The registry maps command names to descriptors. It is built once from a
//! list of [`CommandInput`]s and never changes afterwards, so it can be
//! shared between sessions behind an `Arc` without locking.

use crate::naming::{DEFAULT_PREFIX, derive_command_name, validate_command_name};
use crate::{CommandDescriptor, CommandError, CommandInput, CommandNaming, Result};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the optional built-in help command
pub const HELP_COMMAND: &str = "help";

/// Immutable, case sensitive command table
///
/// # Example
///
/// ```
/// use telcmd_commands::{CommandInput, CommandRegistry, ParameterType};
///
/// let registry = CommandRegistry::builder()
///     .command(
///         CommandInput::derived("doAdd", |args| {
///             Ok((args.integer(0)? + args.integer(1)?).to_string())
///         })
///         .param(ParameterType::Integer)
///         .param(ParameterType::Integer),
///     )
///     .with_help_command()
///     .build()
///     .unwrap();
///
/// let add = registry.lookup("add").unwrap();
/// assert_eq!(add.call("2 3").unwrap(), "5");
/// assert!(registry.lookup("Add").is_err());
/// ```
#[derive(Clone)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    /// Build a registry with the default naming prefix and no help command
    pub fn build(inputs: impl IntoIterator<Item = CommandInput>) -> Result<Self> {
        RegistryBuilder::new().commands(inputs).build()
    }

    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up a command by its exact name
    pub fn lookup(&self, name: &str) -> Result<&Arc<CommandDescriptor>> {
        self.commands
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))
    }

    /// Check if a command is registered
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Always false for a successfully built registry
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterate over descriptors in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.commands.values()
    }

    /// Render a usage listing of every command, sorted by name
    pub fn help_text(&self) -> String {
        render_help(self.commands.values().map(Arc::as_ref))
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

/// Builder for [`CommandRegistry`]
#[derive(Debug)]
pub struct RegistryBuilder {
    prefix: String,
    help_command: bool,
    inputs: Vec<CommandInput>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            help_command: false,
            inputs: Vec::new(),
        }
    }
}

impl RegistryBuilder {
    /// Create a builder with the default `do` prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prefix stripped from operation names of derived commands
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Register a built-in `help` command listing all commands
    pub fn with_help_command(mut self) -> Self {
        self.help_command = true;
        self
    }

    /// Add a command
    pub fn command(mut self, input: CommandInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add several commands
    pub fn commands(mut self, inputs: impl IntoIterator<Item = CommandInput>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    /// Resolve names and build the registry
    ///
    /// Fails with [`CommandError::EmptyRegistry`] when no commands were
    /// added (the help command does not count), with
    /// [`CommandError::DuplicateCommand`] when two commands resolve to the
    /// same name, and with [`CommandError::InvalidCommandName`] when a name
    /// is empty or contains whitespace.
    pub fn build(self) -> Result<CommandRegistry> {
        if self.inputs.is_empty() {
            return Err(CommandError::EmptyRegistry);
        }

        let mut commands = HashMap::with_capacity(self.inputs.len() + 1);
        for input in self.inputs {
            let name = match &input.naming {
                CommandNaming::Explicit(name) => {
                    validate_command_name(name)?;
                    name.clone()
                }
                CommandNaming::Derived(operation) => derive_command_name(operation, &self.prefix)?,
            };
            insert(&mut commands, CommandDescriptor::from_input(name, input))?;
        }

        if self.help_command {
            let mut text = render_help(commands.values().map(Arc::as_ref));
            let help_line = format!("{HELP_COMMAND} - List available commands");
            text = merge_sorted(&text, &help_line);
            let help = CommandInput::named(HELP_COMMAND, move |_| Ok(text.clone()))
                .with_description("List available commands");
            insert(
                &mut commands,
                CommandDescriptor::from_input(HELP_COMMAND.to_string(), help),
            )?;
        }

        Ok(CommandRegistry { commands })
    }
}

fn insert(
    commands: &mut HashMap<String, Arc<CommandDescriptor>>,
    descriptor: CommandDescriptor,
) -> Result<()> {
    match commands.entry(descriptor.name().to_string()) {
        Entry::Occupied(entry) => Err(CommandError::DuplicateCommand(entry.key().clone())),
        Entry::Vacant(entry) => {
            debug!(command = %descriptor.name(), arity = descriptor.arity(), "Registered command");
            entry.insert(Arc::new(descriptor));
            Ok(())
        }
    }
}

fn help_line(descriptor: &CommandDescriptor) -> String {
    match descriptor.description() {
        Some(description) => format!("{} - {}", descriptor.usage(), description),
        None => descriptor.usage(),
    }
}

fn render_help<'a>(descriptors: impl Iterator<Item = &'a CommandDescriptor>) -> String {
    let mut lines: Vec<String> = descriptors.map(help_line).collect();
    lines.sort_unstable();
    lines.join("\n")
}

fn merge_sorted(text: &str, line: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    lines.push(line);
    lines.sort_unstable();
    lines.join("\n")
}
