//! Keyword-based task classification.

use conductor_core::Task;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Catch-all task type for tasks matching no category.
pub const GENERAL: &str = "general";

/// Task categories recognised by keyword scanning.
///
/// When a task matches several categories the earliest one in [`Self::PRECEDENCE`] wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    /// New code from scratch: scaffolds, prototypes
    Prototyping,
    /// Restructuring existing code
    Refactoring,
    /// Writing or extending tests
    Testing,
    /// Documentation work
    Documentation,
}

impl TaskCategory {
    /// Fixed scan order.
    pub const PRECEDENCE: [Self; 4] = [
        Self::Prototyping,
        Self::Refactoring,
        Self::Testing,
        Self::Documentation,
    ];

    /// Task type name used in routing rules.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prototyping => "prototyping",
            Self::Refactoring => "refactoring",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
        }
    }

    /// Lowercase phrases that put a task into this category.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Prototyping => &[
                "scaffold",
                "prototype",
                "boilerplate",
                "skeleton",
                "proof of concept",
                "spike",
            ],
            Self::Refactoring => &[
                "refactor",
                "clean up",
                "cleanup",
                "restructure",
                "simplify",
                "deduplicate",
            ],
            Self::Testing => &[
                "write tests",
                "add tests",
                "unit test",
                "integration test",
                "test coverage",
                "coverage",
            ],
            Self::Documentation => &["document", "readme", "docstring", "changelog", "docs"],
        }
    }

    fn matches(self, text: &str) -> bool {
        self.keywords().iter().any(|keyword| text.contains(keyword))
    }
}

impl Display for TaskCategory {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

/// Classifies a task into a task type.
///
/// An explicit `task_type` metadata hint wins outright. Otherwise the description and
/// acceptance criteria are scanned, case-insensitively, for each category's keywords in
/// precedence order. Tasks matching nothing are [`GENERAL`].
pub fn classify_task(task: &Task) -> String {
    if let Some(hint) = task.task_type_hint() {
        return hint.to_owned();
    }

    let mut text = task.description.to_lowercase();
    for criterion in &task.acceptance_criteria {
        text.push('\n');
        text.push_str(&criterion.to_lowercase());
    }

    TaskCategory::PRECEDENCE
        .into_iter()
        .find(|category| category.matches(&text))
        .map_or_else(|| GENERAL.to_owned(), |category| category.as_str().to_owned())
}
