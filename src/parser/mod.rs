pub mod dialogue;
pub mod tree;

use crate::stats::{self, PlayAnalysis};
use tree::Document;

/// Two-pass pipeline: tree → dialogue groups → statistics.
pub fn analyze_document(doc: &Document) -> PlayAnalysis {
    stats::analyze(dialogue::dialogue_groups(doc))
}
