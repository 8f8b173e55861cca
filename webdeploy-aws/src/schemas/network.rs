//! VPC lookup and security group schema definitions

use webdeploy_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;

/// Inline security group rule (used for both ingress and egress lists)
fn inline_rule() -> AttributeType {
    AttributeType::Struct {
        name: "SecurityGroupRule".to_string(),
        fields: vec![
            AttributeSchema::new("ip_protocol", aws_types::ip_protocol()).required(),
            AttributeSchema::new("from_port", types::port_number()),
            AttributeSchema::new("to_port", types::port_number()),
            AttributeSchema::new("cidr_ip", types::cidr()),
            AttributeSchema::new("description", AttributeType::String),
        ],
    }
}

/// Returns the schema for the VPC lookup
///
/// Resolved by the engine either by id or as the account's default VPC.
pub fn vpc_lookup_schema() -> ResourceSchema {
    ResourceSchema::new("vpc")
        .with_provider_type("AWS::EC2::VPC")
        .with_description("An existing VPC, looked up at synth time")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .with_description("ID of the VPC to deploy into"),
        )
        .attribute(
            AttributeSchema::new("is_default", AttributeType::Bool)
                .with_description("Look up the account's default VPC"),
        )
        .attribute(
            AttributeSchema::new("region", aws_types::aws_region())
                .required()
                .with_description("Region to look the VPC up in"),
        )
}

/// Returns the schema for Security Group
pub fn security_group_schema() -> ResourceSchema {
    ResourceSchema::new("security_group")
        .with_provider_type("AWS::EC2::SecurityGroup")
        .with_description("An AWS VPC Security Group")
        .attribute(
            AttributeSchema::new("group_description", types::non_empty_string())
                .required()
                .with_description("Description of the Security Group"),
        )
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .with_description("VPC ID for the Security Group"),
        )
        .attribute(
            AttributeSchema::new(
                "security_group_ingress",
                AttributeType::List(Box::new(inline_rule())),
            )
            .with_description("Inbound rules declared inline"),
        )
        .attribute(
            AttributeSchema::new(
                "security_group_egress",
                AttributeType::List(Box::new(inline_rule())),
            )
            .with_description("Outbound rules declared inline"),
        )
}

/// Returns the schema for a standalone Security Group ingress rule
pub fn security_group_ingress_schema() -> ResourceSchema {
    ResourceSchema::new("security_group_ingress")
        .with_provider_type("AWS::EC2::SecurityGroupIngress")
        .with_description("An inbound rule between security groups")
        .attribute(
            AttributeSchema::new("group_id", AttributeType::String)
                .required()
                .with_description("Security Group receiving the rule"),
        )
        .attribute(AttributeSchema::new("ip_protocol", aws_types::ip_protocol()).required())
        .attribute(AttributeSchema::new("from_port", types::port_number()).required())
        .attribute(AttributeSchema::new("to_port", types::port_number()).required())
        .attribute(
            AttributeSchema::new("source_security_group_id", AttributeType::String)
                .with_description("Security Group the traffic comes from"),
        )
        .attribute(AttributeSchema::new("cidr_ip", types::cidr()))
        .attribute(AttributeSchema::new("description", AttributeType::String))
}

/// Returns the schema for a standalone Security Group egress rule
pub fn security_group_egress_schema() -> ResourceSchema {
    ResourceSchema::new("security_group_egress")
        .with_provider_type("AWS::EC2::SecurityGroupEgress")
        .with_description("An outbound rule between security groups")
        .attribute(
            AttributeSchema::new("group_id", AttributeType::String)
                .required()
                .with_description("Security Group owning the rule"),
        )
        .attribute(AttributeSchema::new("ip_protocol", aws_types::ip_protocol()).required())
        .attribute(AttributeSchema::new("from_port", types::port_number()).required())
        .attribute(AttributeSchema::new("to_port", types::port_number()).required())
        .attribute(
            AttributeSchema::new("destination_security_group_id", AttributeType::String)
                .with_description("Security Group the traffic goes to"),
        )
        .attribute(AttributeSchema::new("cidr_ip", types::cidr()))
        .attribute(AttributeSchema::new("description", AttributeType::String))
}

/// Returns all network-related schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        vpc_lookup_schema(),
        security_group_schema(),
        security_group_ingress_schema(),
        security_group_egress_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use webdeploy_core::resource::Value;

    #[test]
    fn valid_security_group() {
        let schema = security_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "id"));
        attrs.insert("group_description".to_string(), Value::from("Allow SSH"));
        attrs.insert(
            "security_group_ingress".to_string(),
            Value::List(vec![Value::map([
                ("ip_protocol", Value::from("tcp")),
                ("from_port", Value::Int(22)),
                ("to_port", Value::Int(22)),
                ("cidr_ip", Value::from("0.0.0.0/0")),
                ("description", Value::from("SSH")),
            ])]),
        );

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn invalid_inline_rule() {
        let schema = security_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::from("vpc-123"));
        attrs.insert("group_description".to_string(), Value::from("bad"));
        attrs.insert(
            "security_group_ingress".to_string(),
            Value::List(vec![Value::map([
                ("ip_protocol", Value::from("tcp")),
                ("from_port", Value::Int(70000)),
                ("to_port", Value::Int(22)),
            ])]),
        );

        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn empty_description_is_rejected() {
        let schema = security_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::from("vpc-123"));
        attrs.insert("group_description".to_string(), Value::from(""));

        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn ingress_requires_ports() {
        let schema = security_group_ingress_schema();
        let mut attrs = HashMap::new();
        attrs.insert("group_id".to_string(), Value::reference("server_sg", "GroupId"));
        attrs.insert("ip_protocol".to_string(), Value::from("tcp"));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn vpc_lookup_requires_region() {
        let schema = vpc_lookup_schema();
        let mut attrs = HashMap::new();
        attrs.insert("is_default".to_string(), Value::Bool(true));
        assert!(schema.validate(&attrs).is_err());

        attrs.insert("region".to_string(), Value::from("us-east-1"));
        assert!(schema.validate(&attrs).is_ok());
    }
}
