//! Plan - Changes a new template would make to a previously synthesized one
//!
//! A Plan is a preview only. Applying it is the provisioning engine's job.

/// Template section a change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Lookups,
    Resources,
    Assets,
    Outputs,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Section::Lookups => "Lookups",
            Section::Resources => "Resources",
            Section::Assets => "Assets",
            Section::Outputs => "Outputs",
        };
        f.write_str(name)
    }
}

/// A single change to a template entry
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Create {
        section: Section,
        logical_id: String,
        resource_type: String,
    },
    Update {
        section: Section,
        logical_id: String,
        resource_type: String,
        /// Property names that differ, sorted
        changed_properties: Vec<String>,
    },
    /// The type changed, so the engine deletes the old entry and creates a new one
    Replace {
        section: Section,
        logical_id: String,
        resource_type: String,
        previous_type: String,
    },
    Delete {
        section: Section,
        logical_id: String,
        resource_type: String,
    },
}

impl Change {
    pub fn logical_id(&self) -> &str {
        match self {
            Change::Create { logical_id, .. }
            | Change::Update { logical_id, .. }
            | Change::Replace { logical_id, .. }
            | Change::Delete { logical_id, .. } => logical_id,
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Change::Create { section, .. }
            | Change::Update { section, .. }
            | Change::Replace { section, .. }
            | Change::Delete { section, .. } => *section,
        }
    }

    /// Logical id, prefixed with the section unless it is a resource
    fn display_id(&self) -> String {
        match self.section() {
            Section::Resources => self.logical_id().to_string(),
            section => format!("{}.{}", section, self.logical_id()),
        }
    }
}

/// Ordered list of changes
#[derive(Debug, Clone, Default)]
pub struct Plan {
    changes: Vec<Change>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change {
                Change::Create { .. } => summary.create += 1,
                Change::Update { .. } => summary.update += 1,
                Change::Replace { .. } => summary.replace += 1,
                Change::Delete { .. } => summary.delete += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}

/// Format a change briefly for display
pub fn format_change_brief(change: &Change) -> String {
    let id = change.display_id();
    match change {
        Change::Create { resource_type, .. } => format!("+ {} ({})", id, resource_type),
        Change::Update {
            resource_type,
            changed_properties,
            ..
        } => format!(
            "~ {} ({}): {}",
            id,
            resource_type,
            changed_properties.join(", ")
        ),
        Change::Replace {
            resource_type,
            previous_type,
            ..
        } => format!("-/+ {} ({} -> {})", id, previous_type, resource_type),
        Change::Delete { resource_type, .. } => format!("- {} ({})", id, resource_type),
    }
}
