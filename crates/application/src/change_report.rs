use std::fmt::{Display, Formatter};

/// Kind of change applied to one graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// Entity was inserted.
    Created,
    /// Entity was overwritten in place.
    Updated,
    /// Entity was deleted.
    Removed,
    /// Entity already existed and was left untouched.
    Skipped,
}

impl ChangeAction {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Removed => "removed",
            Self::Skipped => "skipped",
        }
    }
}

/// Entity collection touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSubject {
    /// Role item.
    Role,
    /// Permission item.
    Permission,
    /// Parent/child edge.
    Edge,
    /// Rule.
    Rule,
    /// User assignment.
    Assignment,
}

impl ChangeSubject {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Permission => "permission",
            Self::Edge => "edge",
            Self::Rule => "rule",
            Self::Assignment => "assignment",
        }
    }
}

/// One entry of a synchronization or import trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphChange {
    /// What happened.
    pub action: ChangeAction,
    /// Which collection it happened to.
    pub subject: ChangeSubject,
    /// Entity key, `parent -> child` for edges and `user -> role` for assignments.
    pub name: String,
}

impl Display for GraphChange {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} {} '{}'",
            self.action.as_str(),
            self.subject.as_str(),
            self.name
        )
    }
}

/// Non-fatal condition raised during synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// An `all` grant matched no synchronized permission.
    EmptyCategoryGrant {
        /// Role receiving the grant.
        role: String,
        /// Normalized category name.
        category: String,
    },
}

impl Display for SyncWarning {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCategoryGrant { role, category } => write!(
                formatter,
                "no permissions found in category '{category}' for role '{role}'"
            ),
        }
    }
}

/// Ordered trace of changes plus warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    changes: Vec<GraphChange>,
    warnings: Vec<SyncWarning>,
}

/// Trace returned by synchronization.
pub type SyncReport = ChangeReport;

/// Trace returned by import.
pub type ImportReport = ChangeReport;

impl ChangeReport {
    /// Appends a change.
    pub fn record(
        &mut self,
        action: ChangeAction,
        subject: ChangeSubject,
        name: impl Into<String>,
    ) {
        self.changes.push(GraphChange {
            action,
            subject,
            name: name.into(),
        });
    }

    /// Appends a warning.
    pub fn warn(&mut self, warning: SyncWarning) {
        self.warnings.push(warning);
    }

    /// Returns changes in the order they were applied.
    #[must_use]
    pub fn changes(&self) -> &[GraphChange] {
        &self.changes
    }

    /// Returns collected warnings.
    #[must_use]
    pub fn warnings(&self) -> &[SyncWarning] {
        &self.warnings
    }

    /// Counts changes matching an action and subject.
    #[must_use]
    pub fn count(&self, action: ChangeAction, subject: ChangeSubject) -> usize {
        self.changes
            .iter()
            .filter(|change| change.action == action && change.subject == subject)
            .count()
    }

    /// Returns true when nothing was created, updated or removed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes
            .iter()
            .all(|change| change.action == ChangeAction::Skipped)
    }
}

pub(crate) fn edge_label(parent: &str, child: &str) -> String {
    format!("{parent} -> {child}")
}

pub(crate) fn assignment_label(user_id: &str, role: &str) -> String {
    format!("{user_id} -> {role}")
}
