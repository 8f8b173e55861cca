//! Config - Deployment parameters validated into a `StackConfig`
//!
//! Parameters arrive as a flat string map (process environment, optionally
//! overridden on the command line). `StackConfig::from_params` is the single
//! place they are checked; everything downstream works on typed values.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde_json::Value as Json;

use crate::instance_type::{InstanceType, InstanceTypeError};
use crate::schemas::types::is_valid_region;

/// Parameter keys
pub mod keys {
    pub const VPC_ID: &str = "vpcId";
    pub const PROJECT_ROOT_DIR: &str = "hereyaProjectRootDir";
    pub const DIST_FOLDER: &str = "distFolder";
    pub const APP_PORT: &str = "appPort";
    pub const INSTANCE_TYPE: &str = "instanceType";
    pub const CUSTOM_DOMAIN: &str = "customDomain";
    pub const DOMAIN_ZONE: &str = "domainZone";
    pub const PROJECT_ENV: &str = "hereyaProjectEnv";
    pub const ACCOUNT: &str = "CDK_DEFAULT_ACCOUNT";
    pub const REGION: &str = "CDK_DEFAULT_REGION";
    pub const STACK_NAME: &str = "STACK_NAME";

    /// Every key read by `StackConfig::from_params`
    pub const ALL: &[&str] = &[
        VPC_ID,
        PROJECT_ROOT_DIR,
        DIST_FOLDER,
        APP_PORT,
        INSTANCE_TYPE,
        CUSTOM_DOMAIN,
        DOMAIN_ZONE,
        PROJECT_ENV,
        ACCOUNT,
        REGION,
        STACK_NAME,
    ];
}

/// Default values and fixed stack constants
pub mod defaults {
    pub const DIST_FOLDER: &str = "dist";
    pub const APP_PORT: u16 = 3000;
    pub const INSTANCE_TYPE: &str = "t3.nano";
    pub const MIN_CAPACITY: i64 = 1;
    pub const MAX_CAPACITY: i64 = 2;
    /// Ubuntu 22.04 images published by Canonical
    pub const AMI_NAME: &str = "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-*";
    pub const AMI_OWNER: &str = "099720109477";
    pub const ASSET_FILE: &str = "dist.zip";
    pub const NODE_ENV: &str = "production";
}

/// Errors raised while validating parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} '{value}': expected a port number between 1 and 65535")]
    InvalidPort { key: &'static str, value: String },

    #[error("Invalid {key}: {source}")]
    InvalidInstanceType {
        key: &'static str,
        #[source]
        source: InstanceTypeError,
    },

    #[error("Invalid region '{0}'")]
    InvalidRegion(String),

    #[error("Cannot derive a hosted zone from '{0}': set domainZone explicitly")]
    InvalidDomain(String),

    #[error("{key} must be a JSON object: {message}")]
    InvalidEnv { key: &'static str, message: String },
}

/// Validated deployment parameters
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    pub stack_name: String,
    pub account: String,
    pub region: String,
    /// Existing VPC; `None` selects the account default VPC
    pub vpc_id: Option<String>,
    pub project_root: PathBuf,
    pub dist_folder: String,
    pub app_port: u16,
    pub instance_type: InstanceType,
    pub custom_domain: String,
    pub domain_zone: String,
    /// Application environment, always carrying `NODE_ENV=production`
    pub app_env: BTreeMap<String, Json>,
}

impl StackConfig {
    /// Validate a flat parameter map
    ///
    /// Empty strings count as unset. Required parameters are checked before
    /// anything else is parsed, so a missing artifact root is reported ahead
    /// of a missing domain.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let project_root = PathBuf::from(require(keys::PROJECT_ROOT_DIR)?);
        // Fully qualified names ("app.example.com.") are accepted
        let custom_domain = strip_root(require(keys::CUSTOM_DOMAIN)?)
            .ok_or(ConfigError::Missing(keys::CUSTOM_DOMAIN))?;
        let account = require(keys::ACCOUNT)?.to_string();
        let region = require(keys::REGION)?.to_string();
        let stack_name = require(keys::STACK_NAME)?.to_string();

        if !is_valid_region(&region) {
            return Err(ConfigError::InvalidRegion(region));
        }

        let app_port = match get(keys::APP_PORT) {
            Some(raw) => parse_port(raw)?,
            None => defaults::APP_PORT,
        };

        let instance_type =
            InstanceType::parse(get(keys::INSTANCE_TYPE).unwrap_or(defaults::INSTANCE_TYPE))
                .map_err(|source| ConfigError::InvalidInstanceType {
                    key: keys::INSTANCE_TYPE,
                    source,
                })?;

        let domain_zone = match get(keys::DOMAIN_ZONE) {
            Some(zone) => strip_root(zone).ok_or(ConfigError::Missing(keys::DOMAIN_ZONE))?,
            None => derive_zone(&custom_domain)?,
        };

        let app_env = parse_env(get(keys::PROJECT_ENV))?;

        let config = Self {
            stack_name,
            account,
            region,
            vpc_id: get(keys::VPC_ID).map(str::to_string),
            project_root,
            dist_folder: get(keys::DIST_FOLDER)
                .unwrap_or(defaults::DIST_FOLDER)
                .to_string(),
            app_port,
            instance_type,
            custom_domain,
            domain_zone,
            app_env,
        };
        log::debug!(
            "config for {}: domain {} in zone {}, port {}, {}",
            config.stack_name,
            config.custom_domain,
            config.domain_zone,
            config.app_port,
            config.instance_type
        );
        Ok(config)
    }

    /// Read every known key from the process environment
    pub fn env_params() -> HashMap<String, String> {
        keys::ALL
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect()
    }

    /// Validate the parameters found in the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_params(&Self::env_params())
    }

    /// `https://<customDomain>`
    pub fn service_url(&self) -> String {
        format!("https://{}", self.custom_domain)
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort {
            key: keys::APP_PORT,
            value: raw.to_string(),
        }),
    }
}

/// Remove one trailing root dot; `None` if nothing is left
fn strip_root(name: &str) -> Option<String> {
    let name = name.strip_suffix('.').unwrap_or(name);
    (!name.is_empty()).then(|| name.to_string())
}

/// Drop the leftmost label: `app.example.com` -> `example.com`
///
/// Not public-suffix aware; `app.co.uk` yields `co.uk`.
pub fn derive_zone(domain: &str) -> Result<String, ConfigError> {
    match domain.split_once('.') {
        Some((_, rest)) if !rest.is_empty() => Ok(rest.to_string()),
        _ => Err(ConfigError::InvalidDomain(domain.to_string())),
    }
}

fn parse_env(raw: Option<&str>) -> Result<BTreeMap<String, Json>, ConfigError> {
    let mut env = match raw {
        Some(raw) => match serde_json::from_str::<Json>(raw) {
            Ok(Json::Object(map)) => map.into_iter().collect(),
            Ok(other) => {
                return Err(ConfigError::InvalidEnv {
                    key: keys::PROJECT_ENV,
                    message: format!("got {}", json_kind(&other)),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidEnv {
                    key: keys::PROJECT_ENV,
                    message: e.to_string(),
                });
            }
        },
        None => BTreeMap::new(),
    };
    env.insert(
        "NODE_ENV".to_string(),
        Json::String(defaults::NODE_ENV.to_string()),
    );
    Ok(env)
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
