//! Template - Render a resource graph into a deployment template
//!
//! The template is the hand-off point to the provisioning engine. Resources
//! become `Resources` entries keyed by CamelCase logical id, lookups land in
//! `Lookups` for the engine to resolve, assets land in `Assets` for upload.
//! All maps are key-sorted, so equal graphs render byte-identical JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json, json};

use crate::case_convert::{logical_id, to_camel_case};
use crate::graph::StackGraph;
use crate::resource::{ResourceKind, Value};
use crate::schema::{AttributeType, ResourceSchema, SchemaRegistry};

/// Errors raised while rendering a template
#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("No schema registered for resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Schema for '{0}' has no provider type")]
    MissingProviderType(String),

    #[error("Reference to unknown resource '{0}'")]
    UnknownReference(String),
}

/// One entry of the `Lookups`, `Resources` or `Assets` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties", default)]
    pub properties: Map<String, Json>,
    #[serde(rename = "UpdatePolicy", default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<Json>,
}

/// One entry of the `Outputs` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(rename = "Value")]
    pub value: Json,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A rendered deployment template
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lookups: BTreeMap<String, TemplateResource>,
    #[serde(default)]
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, TemplateResource>,
    #[serde(default)]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Render a graph into a template using the schemas' provider names
pub fn render(graph: &StackGraph, schemas: &SchemaRegistry) -> Result<Template, TemplateError> {
    let renderer = Renderer { graph };
    let mut template = Template {
        description: graph.description.clone(),
        ..Template::default()
    };

    for resource in graph.resources() {
        let schema = schemas
            .get(&resource.id.resource_type)
            .ok_or_else(|| TemplateError::UnknownResourceType(resource.id.resource_type.clone()))?;
        let provider_type = schema
            .provider_type
            .clone()
            .ok_or_else(|| TemplateError::MissingProviderType(schema.resource_type.clone()))?;

        let mut properties = Map::new();
        for (name, value) in &resource.attributes {
            properties.insert(
                property_name(schema, name),
                renderer.value(value, schema.attributes.get(name).map(|a| &a.attr_type))?,
            );
        }

        let update_policy = resource
            .update_policy
            .as_ref()
            .map(|policy| renderer.value(policy, schema.update_policy.as_ref()))
            .transpose()?;

        let entry = TemplateResource {
            resource_type: provider_type,
            properties,
            update_policy,
        };
        let section = match resource.kind {
            ResourceKind::Managed => &mut template.resources,
            ResourceKind::Lookup => &mut template.lookups,
            ResourceKind::Asset => &mut template.assets,
        };
        section.insert(logical_id(&resource.id.name), entry);
    }

    for output in graph.outputs() {
        template.outputs.insert(
            output.name.clone(),
            TemplateOutput {
                value: renderer.value(&output.value, None)?,
                description: output.description.clone(),
            },
        );
    }

    log::debug!(
        "rendered {}: {} resources, {} lookups, {} assets",
        graph.name,
        template.resources.len(),
        template.lookups.len(),
        template.assets.len()
    );
    Ok(template)
}

fn property_name(schema: &ResourceSchema, attribute: &str) -> String {
    schema
        .provider_name_of(attribute)
        .map(str::to_string)
        .unwrap_or_else(|| to_camel_case(attribute))
}

struct Renderer<'a> {
    graph: &'a StackGraph,
}

impl Renderer<'_> {
    fn value(&self, value: &Value, attr_type: Option<&AttributeType>) -> Result<Json, TemplateError> {
        Ok(match value {
            Value::String(s) => Json::String(s.clone()),
            Value::Int(n) => json!(n),
            Value::Bool(b) => Json::Bool(*b),
            Value::List(items) => {
                let inner = match attr_type {
                    Some(AttributeType::List(inner)) => Some(inner.as_ref()),
                    _ => None,
                };
                Json::Array(
                    items
                        .iter()
                        .map(|item| self.value(item, inner))
                        .collect::<Result<_, _>>()?,
                )
            }
            Value::Map(map) => {
                let mut out = Map::new();
                for (key, v) in map {
                    let (name, inner) = match attr_type {
                        // Free-form maps keep their keys verbatim
                        Some(AttributeType::Map(inner)) => (key.clone(), Some(inner.as_ref())),
                        Some(AttributeType::Struct { fields, .. }) => {
                            match fields.iter().find(|f| &f.name == key) {
                                Some(field) => (
                                    field
                                        .provider_name
                                        .clone()
                                        .unwrap_or_else(|| to_camel_case(key)),
                                    Some(&field.attr_type),
                                ),
                                None => (to_camel_case(key), None),
                            }
                        }
                        _ => (to_camel_case(key), None),
                    };
                    out.insert(name, self.value(v, inner)?);
                }
                Json::Object(out)
            }
            Value::ResourceRef(binding, attribute) => self.reference(binding, attribute)?,
            Value::Join(parts) => {
                let parts = parts
                    .iter()
                    .map(|p| self.value(p, None))
                    .collect::<Result<Vec<_>, _>>()?;
                json!({ "Fn::Join": ["", parts] })
            }
            Value::Base64(inner) => json!({ "Fn::Base64": self.value(inner, None)? }),
        })
    }

    fn reference(&self, binding: &str, attribute: &str) -> Result<Json, TemplateError> {
        let target = self
            .graph
            .get(binding)
            .ok_or_else(|| TemplateError::UnknownReference(binding.to_string()))?;
        let id = logical_id(binding);
        Ok(match (target.kind, attribute) {
            (ResourceKind::Lookup, attr) => json!({ "Lookup": [id, attr] }),
            (ResourceKind::Asset, attr) => json!({ "Asset": [id, attr] }),
            (ResourceKind::Managed, "id") => json!({ "Ref": id }),
            (ResourceKind::Managed, attr) => json!({ "Fn::GetAtt": [id, attr] }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Output;
    use crate::resource::Resource;
    use crate::schema::AttributeSchema;

    fn schemas() -> SchemaRegistry {
        vec![
            ResourceSchema::new("vpc")
                .with_provider_type("AWS::EC2::VPC")
                .attribute(AttributeSchema::new("vpc_id", AttributeType::String)),
            ResourceSchema::new("security_group")
                .with_provider_type("AWS::EC2::SecurityGroup")
                .attribute(
                    AttributeSchema::new("vpc_id", AttributeType::String)
                        .with_provider_name("VpcId"),
                )
                .attribute(AttributeSchema::new("group_description", AttributeType::String))
                .attribute(AttributeSchema::new(
                    "tags",
                    AttributeType::Map(Box::new(AttributeType::String)),
                ))
                .attribute(AttributeSchema::new(
                    "alias",
                    AttributeType::Struct {
                        name: "Alias".to_string(),
                        fields: vec![
                            AttributeSchema::new("dns_name", AttributeType::String)
                                .with_provider_name("DNSName"),
                        ],
                    },
                )),
            ResourceSchema::new("group")
                .with_provider_type("AWS::AutoScaling::AutoScalingGroup")
                .with_update_policy(AttributeType::Struct {
                    name: "UpdatePolicy".to_string(),
                    fields: vec![AttributeSchema::new(
                        "auto_scaling_rolling_update",
                        AttributeType::Struct {
                            name: "AutoScalingRollingUpdate".to_string(),
                            fields: vec![AttributeSchema::new(
                                "pause_time",
                                AttributeType::String,
                            )],
                        },
                    )],
                }),
            ResourceSchema::new("untyped"),
        ]
        .into_iter()
        .collect()
    }

    fn graph() -> StackGraph {
        let mut graph = StackGraph::new("test").with_description("test stack");
        graph
            .add(Resource::lookup("vpc", "vpc").with_attribute("vpc_id", "vpc-123"))
            .unwrap();
        graph
            .add(
                Resource::new("security_group", "server_sg")
                    .with_attribute("vpc_id", Value::reference("vpc", "id"))
                    .with_attribute("group_description", "SSH")
                    .with_attribute("tags", Value::map([("app_name", Value::from("web"))]))
                    .with_attribute(
                        "alias",
                        Value::map([("dns_name", Value::from("lb.example.com"))]),
                    ),
            )
            .unwrap();
        graph
            .add_output(Output::new("GroupId", Value::reference("server_sg", "id")))
            .unwrap();
        graph
            .add_output(
                Output::new("GroupArn", Value::reference("server_sg", "Arn"))
                    .with_description("arn"),
            )
            .unwrap();
        graph
    }

    #[test]
    fn renders_sections_and_names() {
        let template = render(&graph(), &schemas()).unwrap();

        assert_eq!(template.description.as_deref(), Some("test stack"));
        assert_eq!(template.lookups["Vpc"].resource_type, "AWS::EC2::VPC");

        let sg = &template.resources["ServerSg"];
        assert_eq!(sg.resource_type, "AWS::EC2::SecurityGroup");
        assert_eq!(sg.properties["VpcId"], json!({ "Lookup": ["Vpc", "id"] }));
        assert_eq!(sg.properties["GroupDescription"], json!("SSH"));
        assert_eq!(sg.properties["Tags"], json!({ "app_name": "web" }));
        assert_eq!(sg.properties["Alias"], json!({ "DNSName": "lb.example.com" }));

        assert_eq!(template.outputs["GroupId"].value, json!({ "Ref": "ServerSg" }));
        assert_eq!(
            template.outputs["GroupArn"].value,
            json!({ "Fn::GetAtt": ["ServerSg", "Arn"] })
        );
    }

    #[test]
    fn renders_intrinsics() {
        let mut graph = StackGraph::new("t");
        graph.add(Resource::new("untyped", "a")).unwrap();
        graph
            .add(Resource::new("untyped", "b").with_attribute(
                "user_data",
                Value::Base64(Box::new(Value::Join(vec![
                    Value::from("s3://"),
                    Value::reference("a", "id"),
                ]))),
            ))
            .unwrap();
        let registry: SchemaRegistry = vec![ResourceSchema::new("untyped").with_provider_type("X::Y")]
            .into_iter()
            .collect();

        let template = render(&graph, &registry).unwrap();
        assert_eq!(
            template.resources["B"].properties["UserData"],
            json!({ "Fn::Base64": { "Fn::Join": ["", ["s3://", { "Ref": "A" }]] } })
        );
    }

    #[test]
    fn renders_update_policy_beside_properties() {
        let mut graph = StackGraph::new("t");
        graph
            .add(Resource::new("group", "app_asg").with_update_policy(Value::map([(
                "auto_scaling_rolling_update",
                Value::map([("pause_time", Value::from("PT0S"))]),
            )])))
            .unwrap();

        let template = render(&graph, &schemas()).unwrap();
        let asg = &template.resources["AppAsg"];
        assert!(asg.properties.is_empty());
        assert_eq!(
            asg.update_policy,
            Some(json!({ "AutoScalingRollingUpdate": { "PauseTime": "PT0S" } }))
        );

        let json = template.to_json_pretty().unwrap();
        assert!(json.contains("\"UpdatePolicy\""));
        assert!(!render(&self::graph(), &schemas())
            .unwrap()
            .to_json_pretty()
            .unwrap()
            .contains("UpdatePolicy"));
    }

    #[test]
    fn missing_provider_type_is_an_error() {
        let mut graph = StackGraph::new("t");
        graph.add(Resource::new("untyped", "a")).unwrap();
        assert!(matches!(
            render(&graph, &schemas()),
            Err(TemplateError::MissingProviderType(_))
        ));
    }

    #[test]
    fn rendering_is_deterministic_and_round_trips() {
        let a = render(&graph(), &schemas()).unwrap().to_json_pretty().unwrap();
        let b = render(&graph(), &schemas()).unwrap().to_json_pretty().unwrap();
        assert_eq!(a, b);

        let parsed = Template::from_json(&a).unwrap();
        assert_eq!(parsed, render(&graph(), &schemas()).unwrap());
    }
}
