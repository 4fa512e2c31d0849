use super::tree::Document;

pub const SPEAKER_TAG: &str = "SPEAKER";
pub const LINE_TAG: &str = "LINE";

/// One speaker's block: the name exactly as written and the lines it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueGroup {
    pub character: String,
    pub lines: Vec<String>,
}

/// Walk the tree and yield one group per `SPEAKER`, in document order.
///
/// A speaker's lines are the `LINE` children of the speaker's parent element,
/// so every speaker sharing a `SPEECH` gets the full set of that speech's lines.
/// Speakers without a parent, or whose parent holds no lines, yield empty groups.
pub fn dialogue_groups(doc: &Document) -> impl Iterator<Item = DialogueGroup> + '_ {
    doc.elements_named(SPEAKER_TAG).map(move |speaker| {
        let lines = match doc.parent(speaker) {
            Some(container) => doc
                .child_elements_named(container, LINE_TAG)
                .map(|line| doc.text(line))
                .collect(),
            None => Vec::new(),
        };
        DialogueGroup {
            character: doc.text(speaker),
            lines,
        }
    })
}
