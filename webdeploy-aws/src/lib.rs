//! webdeploy AWS stack
//!
//! Maps deployment parameters onto the resources of a web application served
//! from an EC2 auto-scaling fleet behind an application load balancer.

pub mod asset;
pub mod config;
pub mod instance_type;
pub mod schemas;
pub mod stack;
pub mod user_data;

pub use asset::{AssetError, StagedAsset, stage_asset};
pub use config::{ConfigError, StackConfig};
pub use stack::{StackError, build_stack, synthesize};
