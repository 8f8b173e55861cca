//! Graph - An ordered resource graph plus the stack's named outputs
//!
//! Resources are appended in dependency order: a resource may only reference
//! bindings that were added before it. This keeps the graph acyclic without a
//! separate sort step.

use crate::resource::{Resource, ResourceId, Value};
use crate::schema::{SchemaRegistry, TypeError};

/// Errors raised while building or validating a graph
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate resource binding '{0}'")]
    DuplicateBinding(String),

    #[error("{from}: reference to unknown or later resource '{to}'")]
    UnknownReference { from: String, to: String },

    #[error("Duplicate output '{0}'")]
    DuplicateOutput(String),

    #[error("No schema registered for resource type '{0}'")]
    UnknownResourceType(String),

    #[error("{id}: {error}")]
    Invalid { id: ResourceId, error: TypeError },
}

/// A named stack output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
}

impl Output {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Resource graph of one stack
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackGraph {
    pub name: String,
    pub description: Option<String>,
    resources: Vec<Resource>,
    outputs: Vec<Output>,
}

impl StackGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Append a resource; every reference must point at an earlier binding
    pub fn add(&mut self, resource: Resource) -> Result<(), GraphError> {
        if self.get(&resource.id.name).is_some() {
            return Err(GraphError::DuplicateBinding(resource.id.name));
        }
        for value in resource.attributes.values().chain(&resource.update_policy) {
            self.check_references(&resource.id.to_string(), value)?;
        }
        log::debug!("graph {}: added {}", self.name, resource.id);
        self.resources.push(resource);
        Ok(())
    }

    pub fn add_output(&mut self, output: Output) -> Result<(), GraphError> {
        if self.outputs.iter().any(|o| o.name == output.name) {
            return Err(GraphError::DuplicateOutput(output.name));
        }
        self.check_references(&format!("output.{}", output.name), &output.value)?;
        self.outputs.push(output);
        Ok(())
    }

    fn check_references(&self, from: &str, value: &Value) -> Result<(), GraphError> {
        for (binding, _) in value.references() {
            if self.get(binding).is_none() {
                return Err(GraphError::UnknownReference {
                    from: from.to_string(),
                    to: binding.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Look up a resource by binding name
    pub fn get(&self, binding: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id.name == binding)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Resources of the given type, in declaration order
    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Resource> {
        self.resources
            .iter()
            .filter(move |r| r.id.resource_type == resource_type)
    }

    /// Check every resource against its registered schema
    pub fn validate(&self, schemas: &SchemaRegistry) -> Result<(), Vec<GraphError>> {
        let mut errors = Vec::new();

        for resource in &self.resources {
            match schemas.get(&resource.id.resource_type) {
                Some(schema) => {
                    if let Err(type_errors) = schema.validate(&resource.attributes) {
                        errors.extend(type_errors.into_iter().map(|error| GraphError::Invalid {
                            id: resource.id.clone(),
                            error,
                        }));
                    }
                    if let Some(policy) = &resource.update_policy
                        && let Err(error) = schema.validate_update_policy(policy)
                    {
                        errors.push(GraphError::Invalid {
                            id: resource.id.clone(),
                            error,
                        });
                    }
                }
                None => errors.push(GraphError::UnknownResourceType(
                    resource.id.resource_type.clone(),
                )),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
