//! Resource - Typed records that make up a stack's resource graph

use std::collections::HashMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "security_group", "target_group")
    pub resource_type: String,
    /// Binding name, unique within a stack (e.g., "server_sg")
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (binding_name, attribute_name)
    ///
    /// The attribute `id` stands for the resource's primary identifier; any
    /// other attribute name is passed through to the provisioning engine.
    ResourceRef(String, String),
    /// Concatenation of string-valued parts, resolved by the provisioning engine
    Join(Vec<Value>),
    /// Base64 encoding of the inner value, resolved by the provisioning engine
    Base64(Box<Value>),
}

impl Value {
    /// Reference to `binding.attribute`
    pub fn reference(binding: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::ResourceRef(binding.into(), attribute.into())
    }

    /// Build a map value from key/value pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the string contents if this is a plain string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is a plain int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Collect every (binding, attribute) reference nested in this value
    pub fn references(&self) -> Vec<(&str, &str)> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Value::ResourceRef(binding, attr) => out.push((binding, attr)),
            Value::List(items) | Value::Join(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.collect_references(out);
                }
            }
            Value::Base64(inner) => inner.collect_references(out),
            Value::String(_) | Value::Int(_) | Value::Bool(_) => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// How the provisioning engine treats a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceKind {
    /// Created and owned by the stack
    #[default]
    Managed,
    /// Data source resolved by the engine at synth time, never created
    Lookup,
    /// Local file the engine uploads before deployment
    Asset,
}

/// Desired state of a single resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    pub kind: ResourceKind,
    /// How the engine rolls out changes to this resource, outside its properties
    pub update_policy: Option<Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            kind: ResourceKind::Managed,
            update_policy: None,
        }
    }

    /// Create a data source (read-only lookup)
    pub fn lookup(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(resource_type, name).with_kind(ResourceKind::Lookup)
    }

    /// Create a file asset reference
    pub fn asset(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(resource_type, name).with_kind(ResourceKind::Asset)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_update_policy(mut self, policy: Value) -> Self {
        self.update_policy = Some(policy);
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.kind == ResourceKind::Lookup
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
