//! Diagram source detection.
//!
//! A block is a diagram when its trimmed text starts with one of the Mermaid
//! declaration keywords. Matching is a plain, case-sensitive prefix test; the
//! rendering library is responsible for everything past the first word.

use std::fmt;

/// Mermaid diagram construct, identified by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Graph,
    Flowchart,
    Sequence,
    Class,
    State,
    EntityRelationship,
    Journey,
    Gantt,
    Pie,
    GitGraph,
    C4Context,
    Mindmap,
    Timeline,
    QuadrantChart,
    Requirement,
}

impl DiagramKind {
    /// All kinds in keyword matching order.
    pub const ALL: [Self; 15] = [
        Self::Graph,
        Self::Flowchart,
        Self::Sequence,
        Self::Class,
        Self::State,
        Self::EntityRelationship,
        Self::Journey,
        Self::Gantt,
        Self::Pie,
        Self::GitGraph,
        Self::C4Context,
        Self::Mindmap,
        Self::Timeline,
        Self::QuadrantChart,
        Self::Requirement,
    ];

    /// Prefix that identifies this kind.
    ///
    /// `graph ` and `flowchart ` include the trailing space, so a bare
    /// `graph` line is not a diagram.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Graph => "graph ",
            Self::Flowchart => "flowchart ",
            Self::Sequence => "sequenceDiagram",
            Self::Class => "classDiagram",
            Self::State => "stateDiagram",
            Self::EntityRelationship => "erDiagram",
            Self::Journey => "journey",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::GitGraph => "gitGraph",
            Self::C4Context => "C4Context",
            Self::Mindmap => "mindmap",
            Self::Timeline => "timeline",
            Self::QuadrantChart => "quadrantChart",
            Self::Requirement => "requirementDiagram",
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.keyword().trim_end()
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect which diagram construct `text` declares.
///
/// # Example
///
/// ```
/// use mdr_render::{DiagramKind, detect_kind};
///
/// assert_eq!(detect_kind("\n  sequenceDiagram\n  A->>B: hi"), Some(DiagramKind::Sequence));
/// assert_eq!(detect_kind("fn main() {}"), None);
/// ```
#[must_use]
pub fn detect_kind(text: &str) -> Option<DiagramKind> {
    let trimmed = text.trim();
    DiagramKind::ALL
        .into_iter()
        .find(|kind| trimmed.starts_with(kind.keyword()))
}

/// Whether `text` is a diagram description.
#[must_use]
pub fn is_diagram(text: &str) -> bool {
    detect_kind(text).is_some()
}
