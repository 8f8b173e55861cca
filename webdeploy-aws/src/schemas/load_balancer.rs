//! Application load balancer, listener and target group schema definitions

use webdeploy_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;

/// Returns the schema for Application Load Balancer
pub fn load_balancer_schema() -> ResourceSchema {
    ResourceSchema::new("load_balancer")
        .with_provider_type("AWS::ElasticLoadBalancingV2::LoadBalancer")
        .with_description("An application load balancer")
        .attribute(
            AttributeSchema::new(
                "type",
                AttributeType::Enum(vec!["application".to_string(), "network".to_string()]),
            )
            .required(),
        )
        .attribute(
            AttributeSchema::new(
                "scheme",
                AttributeType::Enum(vec!["internet-facing".to_string(), "internal".to_string()]),
            )
            .required(),
        )
        .attribute(AttributeSchema::new("security_groups", aws_types::string_list()))
        .attribute(AttributeSchema::new("subnets", aws_types::string_list()).required())
}

/// Returns the schema for Target Group
pub fn target_group_schema() -> ResourceSchema {
    let matcher = AttributeType::Struct {
        name: "Matcher".to_string(),
        fields: vec![AttributeSchema::new("http_code", AttributeType::String).required()],
    };

    ResourceSchema::new("target_group")
        .with_provider_type("AWS::ElasticLoadBalancingV2::TargetGroup")
        .with_description("Instances receiving forwarded traffic")
        .attribute(
            AttributeSchema::new("port", types::port_number())
                .required()
                .with_description("Port the targets receive traffic on"),
        )
        .attribute(AttributeSchema::new("protocol", aws_types::elb_protocol()).required())
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "target_type",
            AttributeType::Enum(vec![
                "instance".to_string(),
                "ip".to_string(),
                "lambda".to_string(),
                "alb".to_string(),
            ]),
        ))
        .attribute(AttributeSchema::new("health_check_enabled", AttributeType::Bool))
        .attribute(AttributeSchema::new("health_check_path", types::non_empty_string()))
        .attribute(AttributeSchema::new(
            "health_check_port",
            aws_types::health_check_port(),
        ))
        .attribute(AttributeSchema::new(
            "health_check_protocol",
            aws_types::elb_protocol(),
        ))
        .attribute(AttributeSchema::new("matcher", matcher))
}

/// Returns the schema for Listener
pub fn listener_schema() -> ResourceSchema {
    let redirect_config = AttributeType::Struct {
        name: "RedirectConfig".to_string(),
        fields: vec![
            AttributeSchema::new("protocol", aws_types::elb_protocol()).required(),
            // The engine expects the port as a string here
            AttributeSchema::new("port", AttributeType::String).required(),
            AttributeSchema::new(
                "status_code",
                AttributeType::Enum(vec!["HTTP_301".to_string(), "HTTP_302".to_string()]),
            )
            .required(),
        ],
    };
    let action = AttributeType::Struct {
        name: "Action".to_string(),
        fields: vec![
            AttributeSchema::new(
                "type",
                AttributeType::Enum(vec!["forward".to_string(), "redirect".to_string()]),
            )
            .required(),
            AttributeSchema::new("target_group_arn", AttributeType::String),
            AttributeSchema::new("redirect_config", redirect_config),
        ],
    };
    let certificate = AttributeType::Struct {
        name: "Certificate".to_string(),
        fields: vec![AttributeSchema::new("certificate_arn", AttributeType::String).required()],
    };

    ResourceSchema::new("listener")
        .with_provider_type("AWS::ElasticLoadBalancingV2::Listener")
        .with_description("A port + protocol bound on a load balancer")
        .attribute(AttributeSchema::new("load_balancer_arn", AttributeType::String).required())
        .attribute(AttributeSchema::new("port", types::port_number()).required())
        .attribute(AttributeSchema::new("protocol", aws_types::elb_protocol()).required())
        .attribute(AttributeSchema::new(
            "certificates",
            AttributeType::List(Box::new(certificate)),
        ))
        .attribute(
            AttributeSchema::new("default_actions", AttributeType::List(Box::new(action)))
                .required(),
        )
}

/// Returns all load-balancing schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        load_balancer_schema(),
        target_group_schema(),
        listener_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use webdeploy_core::resource::Value;

    #[test]
    fn valid_redirect_listener() {
        let schema = listener_schema();
        let mut attrs = HashMap::new();
        attrs.insert("load_balancer_arn".to_string(), Value::reference("alb", "id"));
        attrs.insert("port".to_string(), Value::Int(80));
        attrs.insert("protocol".to_string(), Value::from("HTTP"));
        attrs.insert(
            "default_actions".to_string(),
            Value::List(vec![Value::map([
                ("type", Value::from("redirect")),
                (
                    "redirect_config",
                    Value::map([
                        ("protocol", Value::from("HTTPS")),
                        ("port", Value::from("443")),
                        ("status_code", Value::from("HTTP_301")),
                    ]),
                ),
            ])]),
        );

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn target_group_rejects_bad_health_check_port() {
        let schema = target_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("port".to_string(), Value::Int(3000));
        attrs.insert("protocol".to_string(), Value::from("HTTP"));
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "id"));
        attrs.insert("health_check_port".to_string(), Value::from("99999"));

        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn load_balancer_scheme_is_an_enum() {
        let schema = load_balancer_schema();
        let mut attrs = HashMap::new();
        attrs.insert("type".to_string(), Value::from("application"));
        attrs.insert("scheme".to_string(), Value::from("public"));
        attrs.insert(
            "subnets".to_string(),
            Value::reference("vpc", "PublicSubnetIds"),
        );

        assert!(schema.validate(&attrs).is_err());
    }
}
