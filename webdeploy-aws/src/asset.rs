//! Asset - Stage the zipped application bundle as an object-storage asset
//!
//! Staging only resolves and fingerprints the local file. Uploading it to the
//! bootstrap bucket is left to the provisioning engine.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use webdeploy_core::resource::Resource;

use crate::config::{StackConfig, defaults};

/// Qualifier of the engine's default bootstrap resources
pub const BOOTSTRAP_QUALIFIER: &str = "hnb659fds";

/// Errors raised while staging an asset
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read asset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A fingerprinted local file and the object it will be uploaded to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub path: PathBuf,
    /// Hex SHA-256 of the file contents
    pub hash: String,
    pub bucket: String,
    pub object_key: String,
    pub region: String,
}

impl StagedAsset {
    /// Graph record for this asset under `binding`
    pub fn to_resource(&self, binding: &str) -> Resource {
        Resource::asset("s3_asset", binding)
            .with_attribute("path", self.path.display().to_string())
            .with_attribute("bucket", self.bucket.as_str())
            .with_attribute("object_key", self.object_key.as_str())
            .with_attribute("hash", self.hash.as_str())
            .with_attribute("region", self.region.as_str())
    }
}

/// `<root>/<dist>/dist.zip`
pub fn asset_path(root: &Path, dist_folder: &str) -> PathBuf {
    root.join(dist_folder).join(defaults::ASSET_FILE)
}

/// Bootstrap bucket receiving file assets for an account and region
pub fn bootstrap_bucket(account: &str, region: &str) -> String {
    format!("cdk-{}-assets-{}-{}", BOOTSTRAP_QUALIFIER, account, region)
}

/// Resolve and hash the application bundle
pub fn stage_asset(
    root: &Path,
    dist_folder: &str,
    account: &str,
    region: &str,
) -> Result<StagedAsset, AssetError> {
    let path = asset_path(root, dist_folder);
    if !path.is_file() {
        return Err(AssetError::NotFound(path));
    }

    let hash = hash_file(&path)?;
    log::info!("staged {} ({})", path.display(), hash);

    Ok(StagedAsset {
        object_key: format!("{}.zip", hash),
        bucket: bootstrap_bucket(account, region),
        region: region.to_string(),
        hash,
        path,
    })
}

/// Stage the bundle named by a validated config
pub fn stage_for(config: &StackConfig) -> Result<StagedAsset, AssetError> {
    stage_asset(
        &config.project_root,
        &config.dist_folder,
        &config.account,
        &config.region,
    )
}

fn hash_file(path: &Path) -> Result<String, AssetError> {
    let read_err = |source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_err)?;
    Ok(format!("{:x}", hasher.finalize()))
}
