//! Request and response shapes of the resource provider operations.
//!
//! Property documents travel as JSON objects, exactly as the engine sends
//! them; the handlers unmarshal them into [`PropertyMap`](crate::value::PropertyMap)s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::check::CheckFailure;
use crate::error::ProviderError;

/// The prefix of every resource URN.
pub const URN_PREFIX: &str = "urn:pulumi:";

const URN_SEPARATOR: &str = "::";

/// A parsed resource URN: `urn:pulumi:<stack>::<project>::<type>::<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn {
    stack: String,
    project: String,
    qualified_type: String,
    name: String,
}

impl Urn {
    /// Build a URN for a top-level resource.
    pub fn new(
        stack: impl Into<String>,
        project: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            project: project.into(),
            qualified_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// The stack name.
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// The project name.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The resource type, without any parent types.
    pub fn resource_type(&self) -> &str {
        self.qualified_type
            .rsplit('$')
            .next()
            .unwrap_or(&self.qualified_type)
    }

    /// The resource name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for Urn {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProviderError::InvalidUrn(s.to_string());
        let rest = s.strip_prefix(URN_PREFIX).ok_or_else(invalid)?;

        let mut parts = rest.splitn(4, URN_SEPARATOR);
        let (Some(stack), Some(project), Some(qualified_type), Some(name)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if qualified_type.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(stack, project, qualified_type, name))
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{sep}{}{sep}{}{sep}{}",
            URN_PREFIX,
            self.stack,
            self.project,
            self.qualified_type,
            self.name,
            sep = URN_SEPARATOR
        )
    }
}

/// The result of validating a resource's inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResponse {
    /// The inputs to use for subsequent operations.
    pub inputs: Value,
    /// Properties that did not validate.
    pub failures: Vec<CheckFailure>,
}

/// Whether a diff found any change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DiffChanges {
    /// Old and new properties are the same.
    #[default]
    None,
    /// Something changed.
    Some,
}

impl From<bool> for DiffChanges {
    fn from(changed: bool) -> Self {
        if changed {
            Self::Some
        } else {
            Self::None
        }
    }
}

/// The result of comparing a resource's old and new properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffResponse {
    /// Whether anything changed.
    pub changes: DiffChanges,
    /// Paths of changed properties that require replacing the resource.
    pub replaces: Vec<String>,
    /// Properties guaranteed not to change.
    pub stables: Vec<String>,
    /// Whether a replacement must delete the old resource first.
    pub delete_before_replace: bool,
}

impl DiffResponse {
    /// Whether the update needs a replacement.
    pub fn requires_replace(&self) -> bool {
        !self.replaces.is_empty()
    }
}

/// The result of creating a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateResponse {
    /// The ID of the new resource.
    pub id: String,
    /// The resource's output properties.
    pub properties: Value,
}

/// The live state of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResponse {
    /// The ID of the resource.
    pub id: String,
    /// The resource's current properties.
    pub properties: Value,
}

/// The result of updating a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// The resource's output properties.
    pub properties: Value,
}

/// Information about the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// The plugin version.
    pub version: String,
}
