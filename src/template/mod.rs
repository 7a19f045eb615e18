//! Template builder.
//!
//! A [`Template`] is assembled in one synchronous pass: parameters, resources
//! and outputs are registered through `&mut` calls, each of which checks the
//! invariants it can check immediately (valid and unique logical ids, required
//! properties, parameter constraints). [`Template::validate`] runs the
//! whole-document checks (dangling references, circular dependencies, empty
//! template) and is invoked by [`Template::to_json`], the single finalize step.
//!
//! ```rust
//! use cfnforge::template::{Parameter, Resource, ResourceType, Template};
//!
//! let mut template = Template::new().with_description("demo");
//! let location = template.add_parameter(Parameter::string("SSHLocation"))?;
//! template.add_resource(
//!     Resource::new("SSHSecurityGroup", ResourceType::Ec2SecurityGroup)
//!         .property("GroupDescription", "ssh")
//!         .property("SecurityGroupIngress", location.reference()),
//! )?;
//! let json = template.to_json(Default::default())?;
//! assert!(json.contains("SSHSecurityGroup"));
//! # Ok::<(), cfnforge::error::Error>(())
//! ```

mod output;
mod parameter;
mod resource;

pub use output::Output;
pub use parameter::{Parameter, ParameterType};
pub use resource::{Resource, ResourceType};

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::expr::{Expr, Reference};

/// The only template format version CloudFormation accepts.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Maximum length of a logical id.
const MAX_LOGICAL_ID_LEN: usize = 255;

/// A reference to a declared parameter or resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    id: String,
}

impl Handle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The logical id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `Ref` to the declared entity.
    pub fn reference(&self) -> Expr {
        Expr::reference(self.id.clone())
    }

    /// `Fn::GetAtt` on the declared resource.
    pub fn get_att(&self, attribute: impl Into<String>) -> Expr {
        Expr::get_att(self.id.clone(), attribute)
    }
}

impl From<&Handle> for Expr {
    fn from(handle: &Handle) -> Self {
        handle.reference()
    }
}

/// How the document is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    /// Indented output
    Pretty {
        /// Spaces per nesting level
        indent: usize,
    },
    /// Single line
    Compact,
}

impl Default for JsonStyle {
    fn default() -> Self {
        JsonStyle::Pretty { indent: 4 }
    }
}

/// The root document describing everything deployed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    description: Option<String>,
    parameters: IndexMap<String, Parameter>,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
}

impl Template {
    /// Creates an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the template description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares a parameter.
    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<Handle> {
        let id = parameter.logical_id().to_string();
        self.check_new_id(&id)?;
        parameter.validate()?;
        debug!(parameter = %id, kind = %parameter.param_type(), "Declared parameter");
        self.parameters.insert(id.clone(), parameter);
        Ok(Handle::new(id))
    }

    /// Declares a resource.
    pub fn add_resource(&mut self, resource: Resource) -> Result<Handle> {
        let id = resource.logical_id().to_string();
        self.check_new_id(&id)?;
        resource.check_required()?;
        debug!(resource = %id, kind = %resource.resource_type(), "Declared resource");
        self.resources.insert(id.clone(), resource);
        Ok(Handle::new(id))
    }

    /// Declares an output. Outputs have their own namespace.
    pub fn add_output(&mut self, output: Output) -> Result<()> {
        let id = output.logical_id().to_string();
        if !is_valid_logical_id(&id) {
            return Err(Error::InvalidLogicalId(id));
        }
        if self.outputs.contains_key(&id) {
            return Err(Error::DuplicateLogicalId {
                id,
                existing: "output",
            });
        }
        debug!(output = %id, "Declared output");
        self.outputs.insert(id, output);
        Ok(())
    }

    fn check_new_id(&self, id: &str) -> Result<()> {
        if !is_valid_logical_id(id) {
            return Err(Error::InvalidLogicalId(id.to_string()));
        }
        let existing = if self.parameters.contains_key(id) {
            "parameter"
        } else if self.resources.contains_key(id) {
            "resource"
        } else {
            return Ok(());
        };
        Err(Error::DuplicateLogicalId {
            id: id.to_string(),
            existing,
        })
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.get(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    /// Runs the whole-document checks.
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() {
            return Err(Error::EmptyTemplate);
        }

        for resource in self.resources.values() {
            for reference in resource.references() {
                self.check_reference(resource.logical_id(), reference)?;
            }
            for dependency in resource.dependencies() {
                if !self.resources.contains_key(dependency) {
                    return Err(Error::DanglingReference {
                        from: resource.logical_id().to_string(),
                        target: dependency.clone(),
                        hint: " as a resource (DependsOn)".to_string(),
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        let mut path = Vec::new();
        for id in self.resources.keys() {
            self.visit_dependencies(id, &mut visited, &mut path)?;
        }

        for output in self.outputs.values() {
            for reference in output.expressions().flat_map(Expr::references) {
                self.check_reference(output.logical_id(), reference)?;
            }
        }
        Ok(())
    }

    /// Depth-first walk over `Ref`, `Fn::GetAtt` and `DependsOn` edges between resources.
    fn visit_dependencies<'a>(
        &'a self,
        id: &'a str,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        if let Some(start) = path.iter().position(|p| *p == id) {
            let mut cycle: Vec<&str> = path[start..].to_vec();
            cycle.push(id);
            return Err(Error::CircularDependency(cycle.join(" -> ")));
        }
        if visited.contains(id) {
            return Ok(());
        }
        let Some(resource) = self.resources.get(id) else {
            return Ok(());
        };

        path.push(id);
        for target in dependency_edges(resource) {
            if self.resources.contains_key(target) {
                self.visit_dependencies(target, visited, path)?;
            }
        }
        path.pop();
        visited.insert(id);
        Ok(())
    }

    fn check_reference(&self, from: &str, reference: Reference<'_>) -> Result<()> {
        match reference {
            Reference::Ref(target) => {
                if Expr::is_pseudo_parameter(target)
                    || self.parameters.contains_key(target)
                    || self.resources.contains_key(target)
                {
                    Ok(())
                } else {
                    Err(Error::dangling(from, target))
                }
            }
            Reference::GetAtt(target) => {
                if self.resources.contains_key(target) {
                    Ok(())
                } else if self.parameters.contains_key(target) {
                    Err(Error::DanglingReference {
                        from: from.to_string(),
                        target: target.to_string(),
                        hint: " as a resource (Fn::GetAtt cannot target a parameter)".to_string(),
                    })
                } else {
                    Err(Error::dangling(from, target))
                }
            }
        }
    }

    /// Validates and renders the document.
    pub fn to_json(&self, style: JsonStyle) -> Result<String> {
        self.validate()?;
        let json = match style {
            JsonStyle::Compact => serde_json::to_string(self)?,
            JsonStyle::Pretty { indent } => {
                let indent = " ".repeat(indent);
                let mut buf = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                self.serialize(&mut ser)?;
                String::from_utf8(buf).map_err(|e| {
                    Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                })?
            }
        };
        info!(
            parameters = self.parameters.len(),
            resources = self.resources.len(),
            outputs = self.outputs.len(),
            bytes = json.len(),
            "Rendered template"
        );
        Ok(json)
    }
}

impl Serialize for Template {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("AWSTemplateFormatVersion", FORMAT_VERSION)?;
        if let Some(description) = &self.description {
            map.serialize_entry("Description", description)?;
        }
        if !self.parameters.is_empty() {
            map.serialize_entry("Parameters", &self.parameters)?;
        }
        map.serialize_entry("Resources", &self.resources)?;
        if !self.outputs.is_empty() {
            map.serialize_entry("Outputs", &self.outputs)?;
        }
        map.end()
    }
}

fn dependency_edges(resource: &Resource) -> Vec<&str> {
    resource
        .references()
        .into_iter()
        .map(|reference| match reference {
            Reference::Ref(id) | Reference::GetAtt(id) => id,
        })
        .chain(resource.dependencies().iter().map(String::as_str))
        .collect()
}

/// CloudFormation logical ids are alphanumeric.
pub fn is_valid_logical_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_LOGICAL_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}
