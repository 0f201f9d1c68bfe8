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

//! Command Registry and Argument Coercion
//!
//! This crate holds the transport independent half of telcmd: a table of
//! named, typed operations and the rules that turn a line of text into a
//! call on one of them.
//!
//! ```text
//! "add 2 3"
//!     ↓ split_command_line
//! ("add", "2 3")
//!     ↓ CommandRegistry::lookup
//! CommandDescriptor { add <integer> <integer> }
//!     ↓ CommandDescriptor::coerce
//! Arguments [Integer(2), Integer(3)]
//!     ↓ CommandDescriptor::invoke
//! "5"
//! ```
//!
//! # Example
//!
//! ```
//! use telcmd_commands::{CommandInput, CommandRegistry, ParameterType, split_command_line};
//!
//! let registry = CommandRegistry::build(vec![
//!     CommandInput::named("add", |args| {
//!         Ok((args.integer(0)? + args.integer(1)?).to_string())
//!     })
//!     .param(ParameterType::Integer)
//!     .param(ParameterType::Integer),
//! ])
//! .unwrap();
//!
//! let (name, rest) = split_command_line("add 2 3").unwrap();
//! let result = registry.lookup(name).unwrap().call(rest).unwrap();
//! assert_eq!(result, "5");
//! ```

mod coerce;
mod descriptor;
mod error;
mod naming;
mod registry;
mod value;

pub use coerce::{coerce, convert, split_command_line, tokenize};
pub use descriptor::{CommandDescriptor, CommandInput, CommandNaming, Invoker, ParameterSpec};
pub use error::{CommandError, HandlerError, Result};
pub use naming::{DEFAULT_PREFIX, derive_command_name, validate_command_name};
pub use registry::{CommandRegistry, HELP_COMMAND, RegistryBuilder};
pub use value::{Arguments, CustomType, ParameterType, ParseFn, Value};
