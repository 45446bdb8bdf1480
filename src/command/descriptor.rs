//! Command identity.
//!
//! # Responsibilities
//! - Identify a logical command by group key and command key
//! - Fill missing keys from the call site (type name, operation name)
//! - Reject descriptors that cannot name a command
//!
//! # Design Decisions
//! - Immutable once built; cloned into the worker and the handle
//! - An empty group key falls back to the command key, so the command forms
//!   its own isolation group

use serde::Serialize;
use std::fmt;

use crate::command::error::CommandError;

/// Where a wrapped call originates. Used only to default descriptor keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    type_name: &'static str,
    operation: &'static str,
}

impl CallSite {
    pub fn new(type_name: &'static str, operation: &'static str) -> Self {
        Self {
            type_name,
            operation,
        }
    }

    /// Call site for an operation on `T`, named after `T`'s simple type name.
    pub fn of<T: ?Sized>(operation: &'static str) -> Self {
        Self::new(simple_type_name(std::any::type_name::<T>()), operation)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Strip module path and generic arguments: `a::b::Foo<c::Bar>` → `Foo`.
fn simple_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn non_empty(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

/// Identifies a command for isolation grouping and health lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CommandDescriptor {
    group_key: String,
    command_key: String,
}

impl CommandDescriptor {
    pub fn new(group_key: impl Into<String>, command_key: impl Into<String>) -> Self {
        let command_key = command_key.into().trim().to_string();
        let group_key = group_key.into().trim().to_string();
        let group_key = if group_key.is_empty() {
            command_key.clone()
        } else {
            group_key
        };

        Self {
            group_key,
            command_key,
        }
    }

    /// Build a descriptor from optional explicit keys, defaulting the group
    /// to the caller's type and the command to the caller's operation.
    pub fn resolve(group_key: Option<&str>, command_key: Option<&str>, site: &CallSite) -> Self {
        let group = non_empty(group_key).unwrap_or(site.type_name());
        let command = non_empty(command_key).unwrap_or(site.operation());
        Self::new(group, command)
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn command_key(&self) -> &str {
        &self.command_key
    }

    /// Check that the descriptor names a command.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.command_key.is_empty() {
            return Err(CommandError::DescriptorInvalid(format!(
                "command key is empty (group {:?})",
                self.group_key
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group_key, self.command_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct InventoryService;

    #[test]
    fn test_call_site_uses_simple_type_name() {
        let site = CallSite::of::<InventoryService>("reserve");
        assert_eq!(site.type_name(), "InventoryService");

        let generic = CallSite::of::<Vec<InventoryService>>("len");
        assert_eq!(generic.type_name(), "Vec");
    }

    #[test]
    fn test_resolve_defaults_from_call_site() {
        let site = CallSite::of::<InventoryService>("reserve");

        let d = CommandDescriptor::resolve(None, Some(""), &site);
        assert_eq!(d.group_key(), "InventoryService");
        assert_eq!(d.command_key(), "reserve");

        let d = CommandDescriptor::resolve(Some("stock"), Some("hold"), &site);
        assert_eq!(d.group_key(), "stock");
        assert_eq!(d.command_key(), "hold");
    }

    #[test]
    fn test_empty_command_key_is_invalid() {
        let site = CallSite::new("Anonymous", "");
        let d = CommandDescriptor::resolve(None, Some(""), &site);
        assert!(matches!(d.validate(), Err(CommandError::DescriptorInvalid(_))));
    }

    #[test]
    fn test_empty_group_falls_back_to_command() {
        let d = CommandDescriptor::new("  ", "ping");
        assert_eq!(d.group_key(), "ping");
        assert_eq!(d.to_string(), "ping.ping");
        assert!(d.validate().is_ok());
    }
}
