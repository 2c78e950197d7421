use serde::Serialize;

/// Category of a non-fatal problem recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// The file has a syntax error and contributes nothing.
    ParseFailure,
    /// The file could not be read or is not valid UTF-8.
    UnreadableFile,
    /// A re-export chain loops back onto itself.
    AliasCycle,
    /// A re-export chain is longer than `analysis.max_alias_depth`.
    AliasDepthExceeded,
    /// Two project directories declare the same package name.
    DuplicateProjectName,
}

/// A non-fatal problem. Warnings travel with the result instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(
        kind: WarningKind,
        project: &str,
        file: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        let warning = Self {
            kind,
            project: project.to_owned(),
            file: file.map(str::to_owned),
            message: message.into(),
        };
        tracing::warn!(
            project = %warning.project,
            file = warning.file.as_deref().unwrap_or("-"),
            "{}",
            warning.message
        );
        warning
    }
}
