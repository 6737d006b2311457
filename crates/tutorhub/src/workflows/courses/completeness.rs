use crate::workflows::WorkflowError;

use super::domain::{CourseTree, SectionId};

/// Verdict of the minimum-structure check a course must pass before review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    NoSections,
    /// First section, in course order, that has no articles.
    EmptySection { section_id: SectionId, title: String },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }

    /// Turn a failed check into the caller-facing error.
    pub fn into_result(self) -> Result<(), WorkflowError> {
        match self {
            Completeness::Complete => Ok(()),
            Completeness::NoSections => Err(WorkflowError::BadRequest(
                "course must have at least one section".to_string(),
            )),
            Completeness::EmptySection { section_id, title } => {
                Err(WorkflowError::BadRequest(format!(
                    "section '{title}' ({}) must have at least one article",
                    section_id.0
                )))
            }
        }
    }
}

/// Pure predicate over a course's content tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletenessChecker;

impl CompletenessChecker {
    pub fn assess(&self, tree: &CourseTree) -> Completeness {
        if tree.sections.is_empty() {
            return Completeness::NoSections;
        }

        tree.sections
            .iter()
            .find(|entry| entry.articles.is_empty())
            .map_or(Completeness::Complete, |entry| Completeness::EmptySection {
                section_id: entry.section.id.clone(),
                title: entry.section.title.clone(),
            })
    }

    pub fn is_publishable(&self, tree: &CourseTree) -> bool {
        self.assess(tree).is_complete()
    }
}
