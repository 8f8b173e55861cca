//! AWS resource schema definitions

pub mod compute;
pub mod dns;
pub mod load_balancer;
pub mod network;
pub mod storage;
pub mod types;

use webdeploy_core::schema::{ResourceSchema, SchemaRegistry};

/// Returns all AWS schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    let mut schemas = Vec::new();
    schemas.extend(network::schemas());
    schemas.extend(dns::schemas());
    schemas.extend(storage::schemas());
    schemas.extend(compute::schemas());
    schemas.extend(load_balancer::schemas());
    schemas
}

/// Registry holding every AWS schema
pub fn registry() -> SchemaRegistry {
    all_schemas().into_iter().collect()
}
