//! Stack - Compose the EC2 web application stack from a validated config
//!
//! Resources are added in dependency order, so every reference in the graph
//! points at something declared before it. The finished graph is checked
//! against the AWS schemas before it is handed back.

use webdeploy_core::graph::{GraphError, Output, StackGraph};
use webdeploy_core::resource::{Resource, Value};
use webdeploy_core::template::{self, Template, TemplateError};

use crate::asset::StagedAsset;
use crate::config::{ConfigError, StackConfig, defaults};
use crate::schemas;
use crate::user_data;

/// Binding names of the stack's resources
pub mod bindings {
    pub const VPC: &str = "vpc";
    pub const HOSTED_ZONE: &str = "hosted_zone";
    pub const CERTIFICATE: &str = "certificate";
    pub const SERVER_SG: &str = "server_sg";
    pub const LB_SG: &str = "load_balancer_sg";
    pub const LB_TO_SERVER_INGRESS: &str = "server_sg_from_load_balancer";
    pub const LB_TO_SERVER_EGRESS: &str = "load_balancer_sg_to_server";
    pub const APP_CODE: &str = "app_code_asset";
    pub const INSTANCE_ROLE: &str = "instance_role";
    pub const INSTANCE_ROLE_POLICY: &str = "instance_role_policy";
    pub const INSTANCE_PROFILE: &str = "instance_profile";
    pub const MACHINE_IMAGE: &str = "ubuntu_image";
    pub const LAUNCH_TEMPLATE: &str = "launch_template";
    pub const LOAD_BALANCER: &str = "app_load_balancer";
    pub const HTTP_LISTENER: &str = "http_listener";
    pub const TARGET_GROUP: &str = "app_fleet";
    pub const HTTPS_LISTENER: &str = "https_listener";
    pub const AUTO_SCALING_GROUP: &str = "app_asg";
    pub const ALIAS_RECORD: &str = "alias_record";
}

/// Output names
pub mod outputs {
    pub const ALB_DNS: &str = "AlbDns";
    pub const SERVICE_URL: &str = "ServiceUrl";
}

const ANYWHERE: &str = "0.0.0.0/0";
const HTTP_PORT: i64 = 80;
const HTTPS_PORT: i64 = 443;
const SSH_PORT: i64 = 22;

/// Errors raised while composing the stack
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{} validation error(s):\n{}", .0.len(), format_errors(.0))]
    Validation(Vec<GraphError>),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to serialize process manager manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

fn format_errors(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the resource graph for `config`
pub fn build_stack(config: &StackConfig, asset: &StagedAsset) -> Result<StackGraph, StackError> {
    let mut graph = StackGraph::new(&config.stack_name).with_description(format!(
        "Web application on EC2 behind a load balancer at {}",
        config.custom_domain
    ));
    let app_port = i64::from(config.app_port);

    // Lookups
    let vpc = Resource::lookup("vpc", bindings::VPC).with_attribute("region", config.region.as_str());
    let vpc = match &config.vpc_id {
        Some(id) => vpc.with_attribute("vpc_id", id.as_str()),
        None => vpc.with_attribute("is_default", true),
    };
    graph.add(vpc)?;
    graph.add(
        Resource::lookup("hosted_zone", bindings::HOSTED_ZONE)
            .with_attribute("domain_name", config.domain_zone.as_str()),
    )?;

    graph.add(
        Resource::new("certificate", bindings::CERTIFICATE)
            .with_attribute("domain_name", config.custom_domain.as_str())
            .with_attribute("validation_method", "DNS")
            .with_attribute(
                "domain_validation_options",
                Value::List(vec![Value::map([
                    ("domain_name", Value::from(config.custom_domain.as_str())),
                    ("hosted_zone_id", Value::reference(bindings::HOSTED_ZONE, "id")),
                ])]),
            ),
    )?;

    add_security_groups(&mut graph, app_port)?;

    graph.add(asset.to_resource(bindings::APP_CODE))?;
    add_instance_role(&mut graph)?;

    graph.add(
        Resource::lookup("machine_image", bindings::MACHINE_IMAGE)
            .with_attribute("name", defaults::AMI_NAME)
            .with_attribute("owners", Value::List(vec![Value::from(defaults::AMI_OWNER)])),
    )?;

    let script = user_data::startup_script(config, asset, bindings::APP_CODE)?;
    graph.add(
        Resource::new("launch_template", bindings::LAUNCH_TEMPLATE).with_attribute(
            "launch_template_data",
            Value::map([
                ("image_id", Value::reference(bindings::MACHINE_IMAGE, "id")),
                ("instance_type", Value::from(config.instance_type.to_string())),
                (
                    "security_group_ids",
                    Value::List(vec![Value::reference(bindings::SERVER_SG, "GroupId")]),
                ),
                (
                    "iam_instance_profile",
                    Value::map([("arn", Value::reference(bindings::INSTANCE_PROFILE, "Arn"))]),
                ),
                ("user_data", script.to_value()),
            ]),
        ),
    )?;

    add_load_balancer(&mut graph, config)?;

    graph.add(
        Resource::new("auto_scaling_group", bindings::AUTO_SCALING_GROUP)
            .with_attribute("min_size", defaults::MIN_CAPACITY)
            .with_attribute("max_size", defaults::MAX_CAPACITY)
            .with_attribute(
                "launch_template",
                Value::map([
                    ("launch_template_id", Value::reference(bindings::LAUNCH_TEMPLATE, "id")),
                    (
                        "version",
                        Value::reference(bindings::LAUNCH_TEMPLATE, "LatestVersionNumber"),
                    ),
                ]),
            )
            .with_attribute(
                "vpc_zone_identifier",
                Value::reference(bindings::VPC, "PublicSubnetIds"),
            )
            .with_attribute(
                "target_group_arns",
                Value::List(vec![Value::reference(bindings::TARGET_GROUP, "id")]),
            )
            .with_update_policy(rolling_update()),
    )?;

    graph.add(
        Resource::new("record_set", bindings::ALIAS_RECORD)
            .with_attribute("name", format!("{}.", config.custom_domain))
            .with_attribute("type", "A")
            .with_attribute("hosted_zone_id", Value::reference(bindings::HOSTED_ZONE, "id"))
            .with_attribute(
                "alias_target",
                Value::map([
                    ("dns_name", Value::reference(bindings::LOAD_BALANCER, "DNSName")),
                    (
                        "hosted_zone_id",
                        Value::reference(bindings::LOAD_BALANCER, "CanonicalHostedZoneID"),
                    ),
                ]),
            ),
    )?;

    graph.add_output(
        Output::new(
            outputs::ALB_DNS,
            Value::reference(bindings::LOAD_BALANCER, "DNSName"),
        )
        .with_description("DNS of the ALB"),
    )?;
    graph.add_output(
        Output::new(outputs::SERVICE_URL, config.service_url())
            .with_description("URL of the service"),
    )?;

    graph
        .validate(&schemas::registry())
        .map_err(StackError::Validation)?;

    log::info!(
        "built stack {} with {} resources",
        graph.name,
        graph.resources().len()
    );
    Ok(graph)
}

/// Replace instances one at a time when the launch template changes
fn rolling_update() -> Value {
    let suspended = [
        "HealthCheck",
        "ReplaceUnhealthy",
        "AZRebalance",
        "AlarmNotification",
        "ScheduledActions",
    ];
    Value::map([
        (
            "auto_scaling_rolling_update",
            Value::map([
                ("wait_on_resource_signals", Value::Bool(false)),
                ("pause_time", Value::from("PT0S")),
                (
                    "suspend_processes",
                    Value::List(suspended.into_iter().map(Value::from).collect()),
                ),
            ]),
        ),
        (
            "auto_scaling_scheduled_action",
            Value::map([("ignore_unmodified_group_size_properties", Value::Bool(true))]),
        ),
    ])
}

/// The startup script as placed in the launch template
pub fn startup_script_of(graph: &StackGraph) -> Option<&Value> {
    match graph.get(bindings::LAUNCH_TEMPLATE)?.get("launch_template_data")? {
        Value::Map(data) => data.get("user_data"),
        _ => None,
    }
}

/// Build the graph and render it into a deployment template
pub fn synthesize(config: &StackConfig, asset: &StagedAsset) -> Result<Template, StackError> {
    let graph = build_stack(config, asset)?;
    Ok(template::render(&graph, &schemas::registry())?)
}

fn add_security_groups(graph: &mut StackGraph, app_port: i64) -> Result<(), GraphError> {
    graph.add(
        Resource::new("security_group", bindings::SERVER_SG)
            .with_attribute("vpc_id", Value::reference(bindings::VPC, "id"))
            .with_attribute(
                "group_description",
                format!("Allow SSH ({}) and HTTP ({})", SSH_PORT, app_port),
            )
            .with_attribute(
                "security_group_ingress",
                Value::List(vec![tcp_from_anywhere(SSH_PORT, "SSH")]),
            )
            .with_attribute("security_group_egress", Value::List(vec![allow_all_outbound()])),
    )?;

    graph.add(
        Resource::new("security_group", bindings::LB_SG)
            .with_attribute("vpc_id", Value::reference(bindings::VPC, "id"))
            .with_attribute(
                "group_description",
                "Automatically created Security Group for the load balancer",
            )
            .with_attribute(
                "security_group_ingress",
                Value::List(vec![
                    tcp_from_anywhere(HTTP_PORT, "Allow from anyone on port 80"),
                    tcp_from_anywhere(HTTPS_PORT, "Allow from anyone on port 443"),
                ]),
            ),
    )?;

    graph.add(
        Resource::new("security_group_ingress", bindings::LB_TO_SERVER_INGRESS)
            .with_attribute("group_id", Value::reference(bindings::SERVER_SG, "GroupId"))
            .with_attribute("ip_protocol", "tcp")
            .with_attribute("from_port", app_port)
            .with_attribute("to_port", app_port)
            .with_attribute(
                "source_security_group_id",
                Value::reference(bindings::LB_SG, "GroupId"),
            )
            .with_attribute("description", "Load balancer to target"),
    )?;

    graph.add(
        Resource::new("security_group_egress", bindings::LB_TO_SERVER_EGRESS)
            .with_attribute("group_id", Value::reference(bindings::LB_SG, "GroupId"))
            .with_attribute("ip_protocol", "tcp")
            .with_attribute("from_port", app_port)
            .with_attribute("to_port", app_port)
            .with_attribute(
                "destination_security_group_id",
                Value::reference(bindings::SERVER_SG, "GroupId"),
            )
            .with_attribute("description", "Load balancer to target"),
    )
}

fn tcp_from_anywhere(port: i64, description: &str) -> Value {
    Value::map([
        ("ip_protocol", Value::from("tcp")),
        ("from_port", Value::Int(port)),
        ("to_port", Value::Int(port)),
        ("cidr_ip", Value::from(ANYWHERE)),
        ("description", Value::from(description)),
    ])
}

fn allow_all_outbound() -> Value {
    Value::map([
        ("ip_protocol", Value::from("-1")),
        ("cidr_ip", Value::from(ANYWHERE)),
        ("description", Value::from("Allow all outbound traffic by default")),
    ])
}

/// Instance role with read access to the application bundle
fn add_instance_role(graph: &mut StackGraph) -> Result<(), GraphError> {
    graph.add(
        Resource::new("iam_role", bindings::INSTANCE_ROLE).with_attribute(
            "assume_role_policy_document",
            policy_document(vec![Value::map([
                ("effect", Value::from("Allow")),
                ("action", Value::List(vec![Value::from("sts:AssumeRole")])),
                (
                    "principal",
                    Value::map([("Service", Value::from("ec2.amazonaws.com"))]),
                ),
            ])]),
        ),
    )?;

    let bucket_arn = Value::Join(vec![
        Value::from("arn:aws:s3:::"),
        Value::reference(bindings::APP_CODE, "bucket"),
    ]);
    let objects_arn = Value::Join(vec![
        Value::from("arn:aws:s3:::"),
        Value::reference(bindings::APP_CODE, "bucket"),
        Value::from("/*"),
    ]);
    graph.add(
        Resource::new("iam_policy", bindings::INSTANCE_ROLE_POLICY)
            .with_attribute("policy_name", "InstanceRoleDefaultPolicy")
            .with_attribute(
                "policy_document",
                policy_document(vec![Value::map([
                    ("effect", Value::from("Allow")),
                    (
                        "action",
                        Value::List(vec![
                            Value::from("s3:GetObject*"),
                            Value::from("s3:GetBucket*"),
                            Value::from("s3:List*"),
                        ]),
                    ),
                    ("resource", Value::List(vec![bucket_arn, objects_arn])),
                ])]),
            )
            .with_attribute(
                "roles",
                Value::List(vec![Value::reference(bindings::INSTANCE_ROLE, "id")]),
            ),
    )?;

    graph.add(
        Resource::new("instance_profile", bindings::INSTANCE_PROFILE).with_attribute(
            "roles",
            Value::List(vec![Value::reference(bindings::INSTANCE_ROLE, "id")]),
        ),
    )
}

fn policy_document(statements: Vec<Value>) -> Value {
    Value::map([
        ("version", Value::from("2012-10-17")),
        ("statement", Value::List(statements)),
    ])
}

/// Load balancer, target group and the two listeners
fn add_load_balancer(graph: &mut StackGraph, config: &StackConfig) -> Result<(), GraphError> {
    let app_port = i64::from(config.app_port);

    graph.add(
        Resource::new("load_balancer", bindings::LOAD_BALANCER)
            .with_attribute("type", "application")
            .with_attribute("scheme", "internet-facing")
            .with_attribute(
                "security_groups",
                Value::List(vec![Value::reference(bindings::LB_SG, "GroupId")]),
            )
            .with_attribute("subnets", Value::reference(bindings::VPC, "PublicSubnetIds")),
    )?;

    graph.add(
        Resource::new("listener", bindings::HTTP_LISTENER)
            .with_attribute("load_balancer_arn", Value::reference(bindings::LOAD_BALANCER, "id"))
            .with_attribute("port", HTTP_PORT)
            .with_attribute("protocol", "HTTP")
            .with_attribute(
                "default_actions",
                Value::List(vec![Value::map([
                    ("type", Value::from("redirect")),
                    (
                        "redirect_config",
                        Value::map([
                            ("protocol", Value::from("HTTPS")),
                            ("port", Value::from(HTTPS_PORT.to_string())),
                            ("status_code", Value::from("HTTP_301")),
                        ]),
                    ),
                ])]),
            ),
    )?;

    graph.add(
        Resource::new("target_group", bindings::TARGET_GROUP)
            .with_attribute("port", app_port)
            .with_attribute("protocol", "HTTP")
            .with_attribute("vpc_id", Value::reference(bindings::VPC, "id"))
            .with_attribute("target_type", "instance")
            .with_attribute("health_check_path", "/")
            .with_attribute("health_check_port", config.app_port.to_string())
            .with_attribute("health_check_protocol", "HTTP")
            .with_attribute("matcher", Value::map([("http_code", Value::from("200"))])),
    )?;

    graph.add(
        Resource::new("listener", bindings::HTTPS_LISTENER)
            .with_attribute("load_balancer_arn", Value::reference(bindings::LOAD_BALANCER, "id"))
            .with_attribute("port", HTTPS_PORT)
            .with_attribute("protocol", "HTTPS")
            .with_attribute(
                "certificates",
                Value::List(vec![Value::map([(
                    "certificate_arn",
                    Value::reference(bindings::CERTIFICATE, "id"),
                )])]),
            )
            .with_attribute(
                "default_actions",
                Value::List(vec![Value::map([
                    ("type", Value::from("forward")),
                    ("target_group_arn", Value::reference(bindings::TARGET_GROUP, "id")),
                ])]),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    use serde_json::json;

    use webdeploy_core::plan::format_change_brief;

    use crate::config::keys;

    fn params(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut p: HashMap<String, String> = [
            (keys::PROJECT_ROOT_DIR, "/srv/project"),
            (keys::CUSTOM_DOMAIN, "app.example.com"),
            (keys::ACCOUNT, "123456789012"),
            (keys::REGION, "us-east-1"),
            (keys::STACK_NAME, "web"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            p.insert(k.to_string(), v.to_string());
        }
        p
    }

    fn config(extra: &[(&str, &str)]) -> StackConfig {
        StackConfig::from_params(&params(extra)).unwrap()
    }

    fn asset() -> StagedAsset {
        StagedAsset {
            path: PathBuf::from("/srv/project/dist/dist.zip"),
            hash: "abc123".to_string(),
            bucket: "cdk-hnb659fds-assets-123456789012-us-east-1".to_string(),
            object_key: "abc123.zip".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn graph_passes_schema_validation() {
        let graph = build_stack(&config(&[]), &asset()).unwrap();
        assert_eq!(graph.resources().len(), 19);
        assert_eq!(graph.of_type("listener").count(), 2);
        assert_eq!(graph.of_type("security_group").count(), 2);
    }

    #[test]
    fn zone_derived_from_domain() {
        let graph = build_stack(&config(&[]), &asset()).unwrap();
        let zone = graph.get(bindings::HOSTED_ZONE).unwrap();
        assert!(zone.is_data_source());
        assert_eq!(zone.get("domain_name"), Some(&Value::from("example.com")));
    }

    #[test]
    fn health_check_uses_app_port() {
        for port in ["3000", "8080"] {
            let graph = build_stack(&config(&[(keys::APP_PORT, port)]), &asset()).unwrap();
            let tg = graph.get(bindings::TARGET_GROUP).unwrap();
            assert_eq!(tg.get("health_check_port"), Some(&Value::from(port)));
            assert_eq!(tg.get("health_check_path"), Some(&Value::from("/")));
            assert_ne!(tg.get("health_check_port"), Some(&Value::from("80")));
            assert_ne!(tg.get("health_check_port"), Some(&Value::from("443")));
        }
    }

    #[test]
    fn vpc_lookup_by_id_or_default() {
        let graph = build_stack(&config(&[]), &asset()).unwrap();
        let vpc = graph.get(bindings::VPC).unwrap();
        assert_eq!(vpc.get("is_default"), Some(&Value::Bool(true)));
        assert_eq!(vpc.get("vpc_id"), None);

        let graph = build_stack(&config(&[(keys::VPC_ID, "vpc-0abc")]), &asset()).unwrap();
        let vpc = graph.get(bindings::VPC).unwrap();
        assert_eq!(vpc.get("vpc_id"), Some(&Value::from("vpc-0abc")));
        assert_eq!(vpc.get("is_default"), None);
    }

    #[test]
    fn outputs_are_named() {
        let graph = build_stack(&config(&[]), &asset()).unwrap();
        assert_eq!(
            graph.output(outputs::SERVICE_URL).map(|o| &o.value),
            Some(&Value::from("https://app.example.com"))
        );
        assert_eq!(
            graph.output(outputs::ALB_DNS).map(|o| &o.value),
            Some(&Value::reference(bindings::LOAD_BALANCER, "DNSName"))
        );
    }

    #[test]
    fn validation_errors_are_listed() {
        let mut graph = StackGraph::new("broken");
        graph
            .add(Resource::new("target_group", "tg").with_attribute("port", 70000_i64))
            .unwrap();

        let err = StackError::Validation(graph.validate(&schemas::registry()).unwrap_err());
        let message = err.to_string();
        assert!(message.starts_with("3 validation error(s):\n"));
        assert!(message.contains("target_group.tg: Required attribute 'protocol' is missing"));
    }

    #[test]
    fn larger_instance_type_is_carried_through() {
        let template = synthesize(&config(&[(keys::INSTANCE_TYPE, "m6g.2xlarge")]), &asset())
            .unwrap();
        assert_eq!(
            template.resources["LaunchTemplate"].properties["LaunchTemplateData"]["InstanceType"],
            json!("m6g.2xlarge")
        );
    }

    #[test]
    fn identical_inputs_render_identical_templates() {
        let a = synthesize(&config(&[]), &asset()).unwrap().to_json_pretty().unwrap();
        let b = synthesize(&config(&[]), &asset()).unwrap().to_json_pretty().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn https_listener_forwards_to_app_port() {
        let template = synthesize(&config(&[]), &asset()).unwrap();

        let https = &template.resources["HttpsListener"];
        assert_eq!(https.resource_type, "AWS::ElasticLoadBalancingV2::Listener");
        assert_eq!(https.properties["Port"], json!(443));
        assert_eq!(
            https.properties["DefaultActions"],
            json!([{ "Type": "forward", "TargetGroupArn": { "Ref": "AppFleet" } }])
        );
        assert_eq!(
            https.properties["Certificates"],
            json!([{ "CertificateArn": { "Ref": "Certificate" } }])
        );

        let tg = &template.resources["AppFleet"];
        assert_eq!(tg.properties["Port"], json!(3000));
        assert_eq!(tg.properties["HealthCheckPort"], json!("3000"));
        assert_eq!(tg.properties["Matcher"], json!({ "HttpCode": "200" }));
    }

    #[test]
    fn http_listener_redirects() {
        let template = synthesize(&config(&[]), &asset()).unwrap();
        assert_eq!(
            template.resources["HttpListener"].properties["DefaultActions"],
            json!([{
                "Type": "redirect",
                "RedirectConfig": { "Protocol": "HTTPS", "Port": "443", "StatusCode": "HTTP_301" }
            }])
        );
    }

    #[test]
    fn template_sections() {
        let template = synthesize(&config(&[]), &asset()).unwrap();

        assert_eq!(
            template.lookups.keys().collect::<Vec<_>>(),
            vec!["HostedZone", "UbuntuImage", "Vpc"]
        );
        assert_eq!(
            template.assets["AppCodeAsset"].properties["ObjectKey"],
            json!("abc123.zip")
        );
        assert_eq!(
            template.outputs["ServiceUrl"].value,
            json!("https://app.example.com")
        );
        assert_eq!(
            template.outputs["AlbDns"].value,
            json!({ "Fn::GetAtt": ["AppLoadBalancer", "DNSName"] })
        );

        let record = &template.resources["AliasRecord"];
        assert_eq!(record.properties["Name"], json!("app.example.com."));
        assert_eq!(
            record.properties["AliasTarget"]["DNSName"],
            json!({ "Fn::GetAtt": ["AppLoadBalancer", "DNSName"] })
        );
        assert_eq!(
            record.properties["HostedZoneId"],
            json!({ "Lookup": ["HostedZone", "id"] })
        );

        let asg = &template.resources["AppAsg"];
        assert_eq!(asg.properties["MinSize"], json!(1));
        assert_eq!(asg.properties["MaxSize"], json!(2));
        assert_eq!(
            asg.properties["VPCZoneIdentifier"],
            json!({ "Lookup": ["Vpc", "PublicSubnetIds"] })
        );
        assert_eq!(
            asg.update_policy,
            Some(json!({
                "AutoScalingRollingUpdate": {
                    "PauseTime": "PT0S",
                    "SuspendProcesses": [
                        "HealthCheck",
                        "ReplaceUnhealthy",
                        "AZRebalance",
                        "AlarmNotification",
                        "ScheduledActions"
                    ],
                    "WaitOnResourceSignals": false
                },
                "AutoScalingScheduledAction": { "IgnoreUnmodifiedGroupSizeProperties": true }
            }))
        );
        assert!(
            template
                .resources
                .iter()
                .filter(|(id, _)| id.as_str() != "AppAsg")
                .all(|(_, r)| r.update_policy.is_none())
        );
    }

    #[test]
    fn fully_qualified_domain_gets_single_root_dot() {
        let template = synthesize(
            &config(&[(keys::CUSTOM_DOMAIN, "app.example.com.")]),
            &asset(),
        )
        .unwrap();
        assert_eq!(
            template.resources["AliasRecord"].properties["Name"],
            json!("app.example.com.")
        );
        assert_eq!(
            template.lookups["HostedZone"].properties["DomainName"],
            json!("example.com")
        );
        assert_eq!(template.outputs["ServiceUrl"].value, json!("https://app.example.com"));
    }

    #[test]
    fn changed_vpc_shows_up_in_plan() {
        let previous = synthesize(&config(&[]), &asset()).unwrap();
        let desired = synthesize(&config(&[(keys::VPC_ID, "vpc-0abc")]), &asset()).unwrap();

        let plan = webdeploy_core::differ::diff_templates(&desired, &previous);
        assert_eq!(plan.changes().len(), 1);
        assert_eq!(
            format_change_brief(&plan.changes()[0]),
            "~ Lookups.Vpc (AWS::EC2::VPC): IsDefault, VpcId"
        );
    }

    #[test]
    fn startup_script_is_read_back_from_graph() {
        let config = config(&[]);
        let graph = build_stack(&config, &asset()).unwrap();
        let script = user_data::startup_script(&config, &asset(), bindings::APP_CODE).unwrap();

        let value = startup_script_of(&graph).unwrap();
        assert_eq!(value, &script.to_value());
        assert_eq!(user_data::preview_value(value), script.preview());
    }

    #[test]
    fn bucket_access_is_granted_to_instance_role() {
        let template = synthesize(&config(&[]), &asset()).unwrap();
        let policy = &template.resources["InstanceRolePolicy"];
        assert_eq!(
            policy.properties["PolicyDocument"]["Statement"][0]["Resource"][0],
            json!({ "Fn::Join": ["", ["arn:aws:s3:::", { "Asset": ["AppCodeAsset", "bucket"] }]] })
        );
        assert_eq!(
            policy.properties["Roles"],
            json!([{ "Ref": "InstanceRole" }])
        );
    }

    #[test]
    fn user_data_downloads_from_asset_bucket() {
        let template = synthesize(&config(&[]), &asset()).unwrap();
        let data = &template.resources["LaunchTemplate"].properties["LaunchTemplateData"];
        assert_eq!(data["InstanceType"], json!("t3.nano"));
        assert_eq!(data["ImageId"], json!({ "Lookup": ["UbuntuImage", "id"] }));

        let parts = data["UserData"]["Fn::Base64"]["Fn::Join"][1]
            .as_array()
            .unwrap();
        assert!(parts.contains(&json!({ "Asset": ["AppCodeAsset", "bucket"] })));
        assert!(parts.contains(&json!({ "Asset": ["AppCodeAsset", "object_key"] })));
    }

    #[test]
    fn config_error_converts() {
        let err: StackError = ConfigError::Missing(keys::CUSTOM_DOMAIN).into();
        assert_eq!(err.to_string(), "customDomain is required");
    }
}
