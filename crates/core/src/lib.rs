pub use commands::{Command, COMMAND_HELP};
pub use config::ServerConfig;
pub use cue::cue::{Attribute, Cue, CueSequence, CurrentCues, State};
pub use cue::cue_compiler::{
    compile_attributes, compile_cues, compile_states, CueCompilation, ATTRIBUTE_COLUMNS,
    CUE_COLUMNS, STATE_COLUMNS,
};
pub use cue::cue_navigator::CueNavigator;
pub use data::DataManager;
pub use errors::{ErrorLog, FormatCheck, FormatIssue, InvalidCommandInput, Severity, TaskExit};
pub use mesh::daemon::{AlfredDaemon, LoopbackDaemon, MeshDaemon};
pub use mesh::transport::{Channel, MeshTransport};
pub use messages::{ServerCommand, ServerEvent, TableKind};
pub use node_status::{format_last_updated, NodeReport, NodeStatus, NodeStatusTable};
pub use server::CueServer;
pub use show::show_manager::{ShowManager, ShowTables};
pub use store::{CounterStore, JsonStore};
pub use table::RawTable;

pub mod codec;
pub mod commands;
mod config;
mod cue;
mod data;
mod errors;
mod mesh;
pub mod messages;
mod node_status;
mod server;
mod show;
mod store;
mod table;
pub mod templates;
