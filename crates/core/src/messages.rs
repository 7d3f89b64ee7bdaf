use crate::cue::cue::CurrentCues;
use crate::errors::FormatIssue;
use crate::node_status::NodeStatusTable;
use crate::table::RawTable;

/// Which operator table a command refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Attributes,
    States,
    Cues,
}

impl TableKind {
    /// The operator-facing sheet name, used in format messages.
    pub fn name(self) -> &'static str {
        match self {
            TableKind::Attributes => "attributes",
            TableKind::States => "states",
            TableKind::Cues => "all cues",
        }
    }
}

/// Commands sent from the presentation layer to the server core.
#[derive(Debug, Clone)]
pub enum ServerCommand {
    /// The presentation layer is constructed and wired. Releases the setup
    /// barrier; the periodic broadcast and poll tasks start after this.
    Ready,
    /// Advance to the next cue group.
    NextCue,
    /// Go back to the previous cue group.
    PreviousCue,
    /// A line typed into the operator command box.
    CommandLine(String),
    /// Replace one operator table wholesale with an edited script.
    ReplaceTable { kind: TableKind, table: RawTable },
    /// The presentation layer was closed.
    Shutdown,
}

/// Events from the server core back to the presentation layer. Advisory:
/// the presentation layer may also read the shared data model directly.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// The current group changed; carries the fresh snapshot and the reset
    /// node-status shell.
    CueChanged {
        group: usize,
        max_group: usize,
        current: CurrentCues,
        node_statuses: NodeStatusTable,
    },
    /// Node reports arrived or staleness was recomputed.
    NodesUpdated(NodeStatusTable),
    /// Text to show on the operator command line.
    CommandFeedback(String),
    /// A table replacement had a format problem.
    FormatProblem(FormatIssue),
    /// The run loop has ended.
    ShutdownComplete,
}
