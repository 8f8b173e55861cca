//! Differ - Compare a freshly rendered template with a previous one
//!
//! Entries are matched by section and logical id. A changed type cannot be
//! updated in place and is planned as a replacement.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Map;

use crate::plan::{Change, Plan, Section};
use crate::template::{Template, TemplateOutput, TemplateResource};

/// Pseudo type reported for entries of the `Outputs` section
pub const OUTPUT_TYPE: &str = "Output";

/// Result of comparing one resource
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource is new -> needs creation
    Create,
    /// Resource exists with different properties -> needs update
    Update { changed_properties: Vec<String> },
    /// Resource type changed -> needs replacement
    Replace,
    /// Resource exists with no differences -> no action needed
    NoChange,
    /// Resource exists but is no longer desired -> needs deletion
    Delete,
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange)
    }
}

/// Compare the desired and previous version of one resource
pub fn diff(desired: Option<&TemplateResource>, previous: Option<&TemplateResource>) -> Diff {
    match (desired, previous) {
        (Some(_), None) => Diff::Create,
        (None, Some(_)) => Diff::Delete,
        (None, None) => Diff::NoChange,
        (Some(d), Some(p)) if d.resource_type != p.resource_type => Diff::Replace,
        (Some(d), Some(p)) => {
            let mut changed = find_changed_properties(&d.properties, &p.properties);
            if d.update_policy != p.update_policy {
                changed.push("UpdatePolicy".to_string());
            }
            if changed.is_empty() {
                Diff::NoChange
            } else {
                Diff::Update {
                    changed_properties: changed,
                }
            }
        }
    }
}

/// Find properties that were added, removed or modified
fn find_changed_properties(
    desired: &Map<String, serde_json::Value>,
    previous: &Map<String, serde_json::Value>,
) -> Vec<String> {
    let keys: BTreeSet<&String> = desired.keys().chain(previous.keys()).collect();
    keys.into_iter()
        .filter(|k| desired.get(*k) != previous.get(*k))
        .cloned()
        .collect()
}

/// Compare every section of two templates and generate a Plan
pub fn diff_templates(desired: &Template, previous: &Template) -> Plan {
    let mut plan = Plan::new();

    diff_section(&mut plan, Section::Lookups, &desired.lookups, &previous.lookups);
    diff_section(&mut plan, Section::Resources, &desired.resources, &previous.resources);
    diff_section(&mut plan, Section::Assets, &desired.assets, &previous.assets);
    diff_section(
        &mut plan,
        Section::Outputs,
        &outputs_as_entries(&desired.outputs),
        &outputs_as_entries(&previous.outputs),
    );

    log::debug!("{}", plan.summary());
    plan
}

fn diff_section(
    plan: &mut Plan,
    section: Section,
    desired: &BTreeMap<String, TemplateResource>,
    previous: &BTreeMap<String, TemplateResource>,
) {
    let ids: BTreeSet<&String> = desired.keys().chain(previous.keys()).collect();

    for id in ids {
        let d = desired.get(id);
        let p = previous.get(id);
        let logical_id = id.clone();

        let change = match (diff(d, p), d, p) {
            (Diff::Create, Some(d), _) => Change::Create {
                section,
                logical_id,
                resource_type: d.resource_type.clone(),
            },
            (Diff::Update { changed_properties }, Some(d), _) => Change::Update {
                section,
                logical_id,
                resource_type: d.resource_type.clone(),
                changed_properties,
            },
            (Diff::Replace, Some(d), Some(p)) => Change::Replace {
                section,
                logical_id,
                resource_type: d.resource_type.clone(),
                previous_type: p.resource_type.clone(),
            },
            (Diff::Delete, _, Some(p)) => Change::Delete {
                section,
                logical_id,
                resource_type: p.resource_type.clone(),
            },
            _ => continue,
        };
        plan.add(change);
    }
}

/// Outputs compared as entries whose properties are `Value` and `Description`
fn outputs_as_entries(
    outputs: &BTreeMap<String, TemplateOutput>,
) -> BTreeMap<String, TemplateResource> {
    outputs
        .iter()
        .map(|(name, output)| {
            let mut properties = Map::new();
            properties.insert("Value".to_string(), output.value.clone());
            if let Some(description) = &output.description {
                properties.insert("Description".to_string(), description.clone().into());
            }
            let entry = TemplateResource {
                resource_type: OUTPUT_TYPE.to_string(),
                properties,
                update_policy: None,
            };
            (name.clone(), entry)
        })
        .collect()
}
