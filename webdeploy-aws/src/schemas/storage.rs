//! Application artifact (file asset) schema definition

use webdeploy_core::schema::{AttributeSchema, ResourceSchema, types};

use super::types as aws_types;

/// Returns the schema for a zipped file asset uploaded to the bootstrap bucket
pub fn s3_asset_schema() -> ResourceSchema {
    ResourceSchema::new("s3_asset")
        .with_provider_type("AWS::S3::Asset")
        .with_description("A local file the engine uploads before deployment")
        .attribute(
            AttributeSchema::new("path", types::non_empty_string())
                .required()
                .with_description("Local path of the zipped build output"),
        )
        .attribute(AttributeSchema::new("bucket", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("object_key", types::non_empty_string()).required())
        .attribute(
            AttributeSchema::new("hash", types::non_empty_string())
                .required()
                .with_description("SHA-256 of the file contents"),
        )
        .attribute(AttributeSchema::new("region", aws_types::aws_region()).required())
}

/// Returns all storage-related schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![s3_asset_schema()]
}
