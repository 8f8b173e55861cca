//! Hosted zone, certificate and DNS record schema definitions

use webdeploy_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Returns the schema for the hosted zone lookup
pub fn hosted_zone_lookup_schema() -> ResourceSchema {
    ResourceSchema::new("hosted_zone")
        .with_provider_type("AWS::Route53::HostedZone")
        .with_description("An existing public hosted zone, looked up by domain name")
        .attribute(
            AttributeSchema::new("domain_name", types::non_empty_string())
                .required()
                .with_description("Zone apex, e.g. example.com"),
        )
}

/// Returns the schema for a DNS-validated ACM certificate
pub fn certificate_schema() -> ResourceSchema {
    let validation_option = AttributeType::Struct {
        name: "DomainValidationOption".to_string(),
        fields: vec![
            AttributeSchema::new("domain_name", types::non_empty_string()).required(),
            AttributeSchema::new("hosted_zone_id", AttributeType::String).required(),
        ],
    };

    ResourceSchema::new("certificate")
        .with_provider_type("AWS::CertificateManager::Certificate")
        .with_description("A TLS certificate issued by ACM")
        .attribute(
            AttributeSchema::new("domain_name", types::non_empty_string())
                .required()
                .with_description("Fully qualified name the certificate covers"),
        )
        .attribute(
            AttributeSchema::new(
                "validation_method",
                AttributeType::Enum(vec!["DNS".to_string(), "EMAIL".to_string()]),
            )
            .required(),
        )
        .attribute(
            AttributeSchema::new(
                "domain_validation_options",
                AttributeType::List(Box::new(validation_option)),
            )
            .with_description("Hosted zone the validation records are written to"),
        )
}

/// Returns the schema for a Route 53 record set
pub fn record_set_schema() -> ResourceSchema {
    let alias_target = AttributeType::Struct {
        name: "AliasTarget".to_string(),
        fields: vec![
            AttributeSchema::new("dns_name", AttributeType::String)
                .required()
                .with_provider_name("DNSName"),
            AttributeSchema::new("hosted_zone_id", AttributeType::String).required(),
            AttributeSchema::new("evaluate_target_health", AttributeType::Bool),
        ],
    };

    ResourceSchema::new("record_set")
        .with_provider_type("AWS::Route53::RecordSet")
        .with_description("A DNS record in a hosted zone")
        .attribute(
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .with_description("Fully qualified record name"),
        )
        .attribute(
            AttributeSchema::new(
                "type",
                AttributeType::Enum(vec![
                    "A".to_string(),
                    "AAAA".to_string(),
                    "CNAME".to_string(),
                ]),
            )
            .required(),
        )
        .attribute(AttributeSchema::new("hosted_zone_id", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("alias_target", alias_target)
                .with_description("Alias to another AWS resource"),
        )
}

/// Returns all DNS-related schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![
        hosted_zone_lookup_schema(),
        certificate_schema(),
        record_set_schema(),
    ]
}
