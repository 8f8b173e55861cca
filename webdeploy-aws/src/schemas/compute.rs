//! Machine image lookup, IAM and auto-scaling schema definitions

use webdeploy_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;

/// Returns the schema for the machine image lookup
pub fn machine_image_lookup_schema() -> ResourceSchema {
    ResourceSchema::new("machine_image")
        .with_provider_type("AWS::EC2::Image")
        .with_description("Newest AMI matching a name pattern")
        .attribute(
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .with_description("AMI name pattern, may contain *"),
        )
        .attribute(AttributeSchema::new("owners", aws_types::string_list()).required())
}

/// Returns the schema for IAM Role
pub fn iam_role_schema() -> ResourceSchema {
    ResourceSchema::new("iam_role")
        .with_provider_type("AWS::IAM::Role")
        .with_description("Role assumed by the fleet's instances")
        .attribute(
            AttributeSchema::new("assume_role_policy_document", aws_types::policy_document())
                .required(),
        )
}

/// Returns the schema for an inline IAM Policy
pub fn iam_policy_schema() -> ResourceSchema {
    ResourceSchema::new("iam_policy")
        .with_provider_type("AWS::IAM::Policy")
        .with_description("Permissions attached to roles")
        .attribute(AttributeSchema::new("policy_name", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("policy_document", aws_types::policy_document()).required())
        .attribute(AttributeSchema::new("roles", aws_types::string_list()).required())
}

/// Returns the schema for IAM Instance Profile
pub fn instance_profile_schema() -> ResourceSchema {
    ResourceSchema::new("instance_profile")
        .with_provider_type("AWS::IAM::InstanceProfile")
        .attribute(AttributeSchema::new("roles", aws_types::string_list()).required())
}

/// Returns the schema for EC2 Launch Template
pub fn launch_template_schema() -> ResourceSchema {
    let data = AttributeType::Struct {
        name: "LaunchTemplateData".to_string(),
        fields: vec![
            AttributeSchema::new("image_id", AttributeType::String).required(),
            AttributeSchema::new("instance_type", aws_types::instance_type()).required(),
            AttributeSchema::new("security_group_ids", aws_types::string_list()),
            AttributeSchema::new(
                "iam_instance_profile",
                AttributeType::Struct {
                    name: "IamInstanceProfile".to_string(),
                    fields: vec![AttributeSchema::new("arn", AttributeType::String).required()],
                },
            ),
            AttributeSchema::new("user_data", AttributeType::String)
                .with_description("Base64 encoded startup script"),
        ],
    };

    ResourceSchema::new("launch_template")
        .with_provider_type("AWS::EC2::LaunchTemplate")
        .with_description("Instance configuration used by the auto-scaling group")
        .attribute(AttributeSchema::new("launch_template_data", data).required())
}

/// Auto Scaling processes that can be suspended during a rolling update
pub const SCALING_PROCESSES: &[&str] = &[
    "Launch",
    "Terminate",
    "HealthCheck",
    "ReplaceUnhealthy",
    "AZRebalance",
    "AlarmNotification",
    "ScheduledActions",
    "AddToLoadBalancer",
    "InstanceRefresh",
];

/// Update policy accepted by an Auto Scaling Group
pub fn auto_scaling_update_policy() -> AttributeType {
    let rolling_update = AttributeType::Struct {
        name: "AutoScalingRollingUpdate".to_string(),
        fields: vec![
            AttributeSchema::new("max_batch_size", types::positive_int()),
            AttributeSchema::new("min_instances_in_service", AttributeType::Int),
            AttributeSchema::new("pause_time", AttributeType::String)
                .with_description("ISO 8601 duration, e.g. PT5M"),
            AttributeSchema::new(
                "suspend_processes",
                AttributeType::List(Box::new(AttributeType::Enum(
                    SCALING_PROCESSES.iter().map(|p| p.to_string()).collect(),
                ))),
            ),
            AttributeSchema::new("wait_on_resource_signals", AttributeType::Bool),
        ],
    };
    let scheduled_action = AttributeType::Struct {
        name: "AutoScalingScheduledAction".to_string(),
        fields: vec![AttributeSchema::new(
            "ignore_unmodified_group_size_properties",
            AttributeType::Bool,
        )],
    };

    AttributeType::Struct {
        name: "UpdatePolicy".to_string(),
        fields: vec![
            AttributeSchema::new("auto_scaling_rolling_update", rolling_update),
            AttributeSchema::new("auto_scaling_scheduled_action", scheduled_action),
        ],
    }
}

/// Returns the schema for Auto Scaling Group
pub fn auto_scaling_group_schema() -> ResourceSchema {
    let launch_template = AttributeType::Struct {
        name: "LaunchTemplateSpecification".to_string(),
        fields: vec![
            AttributeSchema::new("launch_template_id", AttributeType::String).required(),
            AttributeSchema::new("version", AttributeType::String).required(),
        ],
    };

    ResourceSchema::new("auto_scaling_group")
        .with_provider_type("AWS::AutoScaling::AutoScalingGroup")
        .with_description("Fleet of instances kept between min_size and max_size")
        .with_update_policy(auto_scaling_update_policy())
        .attribute(AttributeSchema::new("min_size", AttributeType::Int).required())
        .attribute(AttributeSchema::new("max_size", types::positive_int()).required())
        .attribute(AttributeSchema::new("launch_template", launch_template).required())
        .attribute(
            AttributeSchema::new("vpc_zone_identifier", aws_types::string_list())
                .required()
                .with_provider_name("VPCZoneIdentifier")
                .with_description("Subnets the instances are launched into"),
        )
        .attribute(
            AttributeSchema::new("target_group_arns", aws_types::string_list())
                .with_provider_name("TargetGroupARNs"),
        )
}

/// Returns all compute-related schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        machine_image_lookup_schema(),
        iam_role_schema(),
        iam_policy_schema(),
        instance_profile_schema(),
        launch_template_schema(),
        auto_scaling_group_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use webdeploy_core::resource::Value;

    #[test]
    fn launch_template_rejects_bad_instance_type() {
        let schema = launch_template_schema();
        let mut attrs = HashMap::new();
        attrs.insert(
            "launch_template_data".to_string(),
            Value::map([
                ("image_id", Value::reference("ubuntu", "id")),
                ("instance_type", Value::from("t3-small")),
            ]),
        );
        assert!(schema.validate(&attrs).is_err());

        attrs.insert(
            "launch_template_data".to_string(),
            Value::map([
                ("image_id", Value::reference("ubuntu", "id")),
                ("instance_type", Value::from("t3.small")),
            ]),
        );
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn auto_scaling_group_requires_positive_max() {
        let schema = auto_scaling_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("min_size".to_string(), Value::Int(0));
        attrs.insert("max_size".to_string(), Value::Int(0));
        attrs.insert(
            "launch_template".to_string(),
            Value::map([
                ("launch_template_id", Value::reference("lt", "id")),
                ("version", Value::reference("lt", "LatestVersionNumber")),
            ]),
        );
        attrs.insert(
            "vpc_zone_identifier".to_string(),
            Value::reference("vpc", "PublicSubnetIds"),
        );

        assert!(schema.validate(&attrs).is_err());
        attrs.insert("max_size".to_string(), Value::Int(2));
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn rolling_update_rejects_unknown_process() {
        let schema = auto_scaling_group_schema();
        let policy = |process: &str| {
            Value::map([(
                "auto_scaling_rolling_update",
                Value::map([
                    ("pause_time", Value::from("PT0S")),
                    ("suspend_processes", Value::List(vec![Value::from(process)])),
                ]),
            )])
        };

        assert!(schema.validate_update_policy(&policy("AZRebalance")).is_ok());
        assert!(schema.validate_update_policy(&policy("Rebalance")).is_err());
        assert!(
            launch_template_schema()
                .validate_update_policy(&policy("AZRebalance"))
                .is_err()
        );
    }
}
