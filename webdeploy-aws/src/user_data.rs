//! User data - Startup script run by every instance of the fleet
//!
//! The script is a list of lines. A line is a sequence of parts; parts may
//! be engine-resolved values (the asset bucket, for instance), so the script
//! renders as `Fn::Base64(Fn::Join(..))` rather than as a plain string.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as Json;
use webdeploy_core::resource::Value;

use crate::asset::StagedAsset;
use crate::config::StackConfig;

const SHEBANG: &str = "#!/bin/bash";
const APP_DIR: &str = "/home/ubuntu/app";

/// System libraries needed by headless browsers the application may launch
const OS_PACKAGES: &str = "gconf-service libasound2 libatk1.0-0 libatk-bridge2.0-0 libc6 \
libcairo2 libcups2 libdbus-1-3 libexpat1 libfontconfig1 libgcc1 libgconf-2-4 \
libgdk-pixbuf2.0-0 libglib2.0-0 libgtk-3-0 libnspr4 libnss3 libpango-1.0-0 \
libpangocairo-1.0-0 libstdc++6 libx11-6 libx11-xcb1 libxcb1 libxcomposite1 libxcursor1 \
libxdamage1 libxext6 libxfixes3 libxi6 libxrandr2 libxrender1 libxss1 libxtst6 \
fonts-liberation libappindicator1 lsb-release xdg-utils wget libgbm1";

const BUILD_PACKAGES: &str = "python3 awscli curl gcc g++ make unzip";

/// Process manager manifest (`ecosystem.json`)
#[derive(Debug, Serialize)]
struct Ecosystem<'a> {
    apps: Vec<EcosystemApp<'a>>,
}

#[derive(Debug, Serialize)]
struct EcosystemApp<'a> {
    name: &'a str,
    script: String,
    cwd: String,
    env: &'a BTreeMap<String, Json>,
}

/// Builder for a bash startup script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    lines: Vec<Vec<Value>>,
}

impl UserData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal commands, one per line
    pub fn add_commands<I, S>(&mut self, commands: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for command in commands {
            self.lines.push(vec![Value::String(command.into())]);
        }
        self
    }

    /// Append a line assembled from literal and engine-resolved parts
    pub fn add_line(&mut self, parts: Vec<Value>) -> &mut Self {
        self.lines.push(parts);
        self
    }

    /// Append commands copying `s3://<bucket>/<key>` to `local_file`
    pub fn add_s3_download_command(
        &mut self,
        bucket: Value,
        key: Value,
        local_file: &str,
        region: &str,
    ) -> &mut Self {
        let file = shell_quote(local_file);
        self.add_commands([format!("mkdir -p $(dirname {})", file)]);
        self.add_line(vec![
            Value::from("aws s3 cp 's3://"),
            bucket,
            Value::from("/"),
            key,
            Value::from(format!("' {} --region {}", file, region)),
        ])
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Engine value of the encoded script
    pub fn to_value(&self) -> Value {
        let mut parts = vec![Value::from(format!("{}\n", SHEBANG))];
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                parts.push(Value::from("\n"));
            }
            parts.extend(line.iter().cloned());
        }
        Value::Base64(Box::new(Value::Join(merge_literals(parts))))
    }

    /// Human-readable script with resolved values shown as `${binding.attr}`
    pub fn preview(&self) -> String {
        preview_value(&self.to_value())
    }
}

/// Decoded text of an engine script value, references shown as `${binding.attr}`
pub fn preview_value(value: &Value) -> String {
    let mut out = String::new();
    write_preview(value, &mut out);
    out
}

fn write_preview(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::ResourceRef(binding, attr) => out.push_str(&format!("${{{}.{}}}", binding, attr)),
        Value::Base64(inner) => write_preview(inner, out),
        Value::Join(parts) => parts.iter().for_each(|p| write_preview(p, out)),
        other => out.push_str(&format!("{:?}", other)),
    }
}

/// Collapse adjacent literal parts so the join stays small
fn merge_literals(parts: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(parts.len());
    for part in parts {
        match (merged.last_mut(), part) {
            (Some(Value::String(prev)), Value::String(s)) => prev.push_str(&s),
            (_, part) => merged.push(part),
        }
    }
    merged
}

/// Wrap `s` in single quotes so bash passes it through verbatim
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// The fleet's startup script
///
/// `asset_binding` names the staged asset in the graph; the bucket and key
/// are referenced through it so the engine fills in the uploaded location.
pub fn startup_script(
    config: &StackConfig,
    asset: &StagedAsset,
    asset_binding: &str,
) -> Result<UserData, serde_json::Error> {
    let dist_dir = format!("{}/dist", APP_DIR);
    let bundle = format!("{}/dist.zip", APP_DIR);
    let manifest_path = format!("{}/ecosystem.json", APP_DIR);

    let ecosystem = Ecosystem {
        apps: vec![EcosystemApp {
            name: "express-app",
            script: format!("{}/index.js", dist_dir),
            cwd: dist_dir.clone(),
            env: &config.app_env,
        }],
    };
    let manifest = serde_json::to_string(&ecosystem)?;

    let mut script = UserData::new();
    script
        .add_commands([
            "sudo apt-get update -y".to_string(),
            format!("sudo apt-get install -y {}", OS_PACKAGES),
            format!("sudo apt-get install -y {}", BUILD_PACKAGES),
            "curl -fsSL https://deb.nodesource.com/setup_20.x | sudo -E bash -".to_string(),
            "sudo apt-get install -y nodejs".to_string(),
            "sudo npm install -g pm2".to_string(),
            format!("mkdir -p {}", APP_DIR),
            format!(
                "echo \"App asset hash: {}\" >> {}/asset-hash.log",
                asset.hash, APP_DIR
            ),
        ])
        .add_s3_download_command(
            Value::reference(asset_binding, "bucket"),
            Value::reference(asset_binding, "object_key"),
            &bundle,
            &asset.region,
        )
        .add_commands([
            format!("cd {}", APP_DIR),
            "unzip dist.zip".to_string(),
            format!("chown -R ubuntu:ubuntu {}", APP_DIR),
            "cd dist".to_string(),
            "sudo -u ubuntu bash -c 'npm install --omit=dev'".to_string(),
            format!("echo {} > {}", shell_quote(&manifest), manifest_path),
            format!(
                "sudo -u ubuntu bash -c 'pm2 start {}'",
                manifest_path
            ),
            "pm2 startup systemd -u ubuntu --hp /home/ubuntu".to_string(),
            "sudo env PATH=$PATH:/usr/bin pm2 startup systemd -u ubuntu --hp /home/ubuntu"
                .to_string(),
            "sudo -u ubuntu bash -c 'pm2 save'".to_string(),
        ]);

    log::debug!("startup script: {} lines", script.len());
    Ok(script)
}
