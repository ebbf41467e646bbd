use crate::ids::TaskId;

/// Evidence lookup for the completion precondition: a task may only be
/// submitted for review once it carries at least one note or document.
pub trait Attachments: Send + Sync {
    fn has_note(&self, task: &TaskId) -> bool;
    fn has_document(&self, task: &TaskId) -> bool;

    fn has_evidence(&self, task: &TaskId) -> bool {
        self.has_note(task) || self.has_document(task)
    }
}

/// Fixed-answer provider for tests and for deployments without a
/// document store wired in.
#[derive(Clone, Copy, Debug)]
pub struct StaticAttachments {
    pub notes: bool,
    pub documents: bool,
}

impl Attachments for StaticAttachments {
    fn has_note(&self, _task: &TaskId) -> bool {
        self.notes
    }

    fn has_document(&self, _task: &TaskId) -> bool {
        self.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_is_note_or_document() {
        let task = TaskId::new();
        let both_missing = StaticAttachments { notes: false, documents: false };
        let note_only = StaticAttachments { notes: true, documents: false };
        let doc_only = StaticAttachments { notes: false, documents: true };
        assert!(!both_missing.has_evidence(&task));
        assert!(note_only.has_evidence(&task));
        assert!(doc_only.has_evidence(&task));
    }
}
