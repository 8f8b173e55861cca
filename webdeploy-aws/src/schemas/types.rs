//! AWS-specific type definitions

use std::sync::LazyLock;

use regex::Regex;
use webdeploy_core::resource::Value;
use webdeploy_core::schema::{AttributeSchema, AttributeType};

use crate::instance_type::InstanceType;

/// Region shape: `<area>[-gov|-iso*]-<direction>-<n>`, e.g. `us-east-1`,
/// `il-central-1`, `us-gov-west-1`
///
/// Only the shape is checked; whether the region is enabled for the account
/// is left to the engine.
static REGION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-[0-9]+$").expect("valid regex")
});

/// Returns true if `s` has the shape of an AWS region name
pub fn is_valid_region(s: &str) -> bool {
    REGION_PATTERN.is_match(s)
}

/// AWS region type with custom validation
pub fn aws_region() -> AttributeType {
    AttributeType::Custom {
        name: "Region".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            if let Value::String(s) = value {
                if is_valid_region(s) {
                    Ok(())
                } else {
                    Err(format!(
                        "Invalid region '{}', expected a region name like us-east-1",
                        s
                    ))
                }
            } else {
                Err("Expected string".to_string())
            }
        },
    }
}

/// EC2 instance type in `class.size` form (e.g., "t3.small")
pub fn instance_type() -> AttributeType {
    AttributeType::Custom {
        name: "InstanceType".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            if let Value::String(s) = value {
                InstanceType::parse(s).map(|_| ()).map_err(|e| e.to_string())
            } else {
                Err("Expected string".to_string())
            }
        },
    }
}

/// IP protocol for security group rules ("-1" is all traffic)
pub fn ip_protocol() -> AttributeType {
    AttributeType::Enum(vec![
        "tcp".to_string(),
        "udp".to_string(),
        "icmp".to_string(),
        "-1".to_string(),
    ])
}

/// Load balancer listener / target group protocol
pub fn elb_protocol() -> AttributeType {
    AttributeType::Enum(vec!["HTTP".to_string(), "HTTPS".to_string()])
}

/// Health check port: a port number as string, or "traffic-port"
pub fn health_check_port() -> AttributeType {
    AttributeType::Custom {
        name: "HealthCheckPort".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s == "traffic-port" => Ok(()),
            Value::String(s) => match s.parse::<u16>() {
                Ok(p) if p > 0 => Ok(()),
                _ => Err(format!(
                    "Invalid health check port '{}', expected 1-65535 or traffic-port",
                    s
                )),
            },
            _ => Err("Expected string".to_string()),
        },
    }
}

/// IAM policy document
pub fn policy_document() -> AttributeType {
    let statement = AttributeType::Struct {
        name: "PolicyStatement".to_string(),
        fields: vec![
            AttributeSchema::new(
                "effect",
                AttributeType::Enum(vec!["Allow".to_string(), "Deny".to_string()]),
            )
            .required(),
            AttributeSchema::new("action", AttributeType::List(Box::new(AttributeType::String)))
                .required(),
            AttributeSchema::new(
                "resource",
                AttributeType::List(Box::new(AttributeType::String)),
            ),
            // Keys are principal kinds ("Service", "AWS") and kept verbatim
            AttributeSchema::new(
                "principal",
                AttributeType::Map(Box::new(AttributeType::String)),
            ),
        ],
    };
    AttributeType::Struct {
        name: "PolicyDocument".to_string(),
        fields: vec![
            AttributeSchema::new("version", AttributeType::String).required(),
            AttributeSchema::new("statement", AttributeType::List(Box::new(statement))).required(),
        ],
    }
}

/// List of strings
pub fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_accepts_aws_format() {
        let region_type = aws_region();
        assert!(
            region_type
                .validate(&Value::String("ap-northeast-1".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn region_rejects_availability_zone() {
        let region_type = aws_region();
        let result = region_type.validate(&Value::String("ap-northeast-1a".to_string()));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid region"));
        assert!(err.contains("us-east-1"));

        for bad in ["US-EAST-1", "useast1", "mars-east-1", "us-east", ""] {
            assert!(
                region_type.validate(&Value::String(bad.to_string())).is_err(),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn region_accepts_recent_and_partitioned_regions() {
        let region_type = aws_region();
        for region in [
            "us-east-1",
            "eu-west-3",
            "il-central-1",
            "ca-west-1",
            "me-central-1",
            "ap-south-2",
            "ap-southeast-4",
            "eu-south-2",
            "us-gov-west-1",
            "us-isob-east-1",
        ] {
            assert!(
                region_type
                    .validate(&Value::String(region.to_string()))
                    .is_ok(),
                "Region {} should be valid",
                region
            );
        }
    }

    #[test]
    fn instance_type_validation() {
        let t = instance_type();
        assert!(t.validate(&Value::String("t3.small".to_string())).is_ok());
        assert!(t.validate(&Value::String("t3".to_string())).is_err());
        assert!(t.validate(&Value::String("t3.huge".to_string())).is_err());
    }

    #[test]
    fn health_check_port_validation() {
        let t = health_check_port();
        assert!(t.validate(&Value::String("3000".to_string())).is_ok());
        assert!(t.validate(&Value::String("traffic-port".to_string())).is_ok());
        assert!(t.validate(&Value::String("0".to_string())).is_err());
        assert!(t.validate(&Value::String("http".to_string())).is_err());
        assert!(t.validate(&Value::Int(3000)).is_err());
    }

    #[test]
    fn policy_document_validation() {
        let doc = Value::map([
            ("version", Value::from("2012-10-17")),
            (
                "statement",
                Value::List(vec![Value::map([
                    ("effect", Value::from("Allow")),
                    ("action", Value::List(vec![Value::from("sts:AssumeRole")])),
                    (
                        "principal",
                        Value::map([("Service", Value::from("ec2.amazonaws.com"))]),
                    ),
                ])]),
            ),
        ]);
        assert!(policy_document().validate(&doc).is_ok());

        let bad = Value::map([
            ("version", Value::from("2012-10-17")),
            (
                "statement",
                Value::List(vec![Value::map([("effect", Value::from("Permit"))])]),
            ),
        ]);
        assert!(policy_document().validate(&bad).is_err());
    }
}
