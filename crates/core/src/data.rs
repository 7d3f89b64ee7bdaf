use std::path::PathBuf;

use chrono::Utc;

use crate::config::ServerConfig;
use crate::cue::cue::{Attribute, CueSequence, CurrentCues, State};
use crate::cue::cue_compiler::{compile_attributes, compile_cues, compile_states};
use crate::cue::cue_navigator::CueNavigator;
use crate::errors::{FormatIssue, InvalidCommandInput};
use crate::messages::TableKind;
use crate::node_status::{NodeReport, NodeStatusTable};
use crate::show::show_manager::{ShowManager, ShowTables};
use crate::store::{CounterStore, JsonStore};
use crate::table::RawTable;
use crate::templates;

/// The whole data model, owned by the orchestrator and shared by reference
/// with every task and the presentation layer. Raw tables are persisted
/// verbatim on every replacement; the typed tables and derived snapshots
/// are rebuilt wholesale, never edited in place.
pub struct DataManager {
    raw_attributes: RawTable,
    raw_states: RawTable,
    raw_cues: RawTable,
    attributes: Vec<Attribute>,
    states: Vec<State>,
    sequence: CueSequence,
    current: CurrentCues,
    nodes: NodeStatusTable,
    navigator: CueNavigator,
    attributes_store: JsonStore<RawTable>,
    states_store: JsonStore<RawTable>,
    cues_store: JsonStore<RawTable>,
    show_manager: ShowManager,
}

impl DataManager {
    /// Restore from the data directory, seeding any empty table from its
    /// built-in template. A stored cue script that no longer compiles (the
    /// operator's last edit was rejected) leaves the sequence empty until
    /// the sheet is fixed; the raw script itself is preserved.
    pub fn new(config: &ServerConfig) -> Self {
        let attributes_store = JsonStore::new(config.attributes_path());
        let states_store = JsonStore::new(config.states_path());
        let cues_store = JsonStore::new(config.cues_path());

        let raw_attributes =
            load_or_template(&attributes_store, templates::attributes_template);
        let raw_states = load_or_template(&states_store, templates::states_template);
        let raw_cues = load_or_template(&cues_store, templates::cues_template);

        let attributes = compile_attributes(&raw_attributes).unwrap_or_else(|check| {
            log::warn!("stored attributes sheet is invalid ({}), ignoring", check.problem);
            Vec::new()
        });
        let states = compile_states(&raw_states).unwrap_or_else(|check| {
            log::warn!("stored states sheet is invalid ({}), ignoring", check.problem);
            Vec::new()
        });
        let sequence = match compile_cues(&raw_cues, &attributes, &states) {
            Ok(compilation) => compilation.sequence,
            Err(check) => {
                log::warn!("stored cue sheet is invalid ({}), ignoring", check.problem);
                CueSequence::default()
            }
        };

        let navigator = CueNavigator::new(
            CounterStore::new(config.cue_num_path()),
            sequence.max_group(),
        );
        let current = CurrentCues::for_group(&sequence, navigator.current());
        let nodes = NodeStatusTable::shell_for(&current);

        Self {
            raw_attributes,
            raw_states,
            raw_cues,
            attributes,
            states,
            sequence,
            current,
            nodes,
            navigator,
            attributes_store,
            states_store,
            cues_store,
            show_manager: ShowManager::new(&config.shows_dir, &config.examples_dir),
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn sequence(&self) -> &CueSequence {
        &self.sequence
    }

    pub fn current_cues(&self) -> &CurrentCues {
        &self.current
    }

    pub fn node_statuses(&self) -> &NodeStatusTable {
        &self.nodes
    }

    pub fn current_group(&self) -> usize {
        self.navigator.current()
    }

    pub fn max_group(&self) -> usize {
        self.navigator.max_group()
    }

    pub fn raw_table(&self, kind: TableKind) -> &RawTable {
        match kind {
            TableKind::Attributes => &self.raw_attributes,
            TableKind::States => &self.raw_states,
            TableKind::Cues => &self.raw_cues,
        }
    }

    /// Replace one operator table with an edited script.
    pub fn replace_table(&mut self, kind: TableKind, raw: RawTable) -> Result<(), FormatIssue> {
        match kind {
            TableKind::Attributes => self.replace_attributes(raw),
            TableKind::States => self.replace_states(raw),
            TableKind::Cues => self.replace_cues(raw),
        }
    }

    pub fn replace_attributes(&mut self, raw: RawTable) -> Result<(), FormatIssue> {
        self.raw_attributes = raw;
        persist(&self.attributes_store, &self.raw_attributes);
        match compile_attributes(&self.raw_attributes) {
            Ok(attributes) => {
                self.attributes = attributes;
                Ok(())
            }
            Err(check) => Err(FormatIssue::from_check(
                TableKind::Attributes.name(),
                check,
                false,
            )),
        }
    }

    pub fn replace_states(&mut self, raw: RawTable) -> Result<(), FormatIssue> {
        self.raw_states = raw;
        persist(&self.states_store, &self.raw_states);
        match compile_states(&self.raw_states) {
            Ok(states) => {
                self.states = states;
                Ok(())
            }
            Err(check) => Err(FormatIssue::from_check(TableKind::States.name(), check, false)),
        }
    }

    /// Replace the cue script. On success the sequence is rebuilt and
    /// navigation is forced back to group 0; a warning still applies the
    /// sequence. The raw script is persisted in every case.
    pub fn replace_cues(&mut self, raw: RawTable) -> Result<(), FormatIssue> {
        self.raw_cues = raw;
        persist(&self.cues_store, &self.raw_cues);
        match compile_cues(&self.raw_cues, &self.attributes, &self.states) {
            Ok(compilation) => {
                self.sequence = compilation.sequence;
                self.navigator.set_max_group(self.sequence.max_group());
                self.navigator.warp(0);
                self.refresh_snapshot();
                match compilation.warning {
                    Some(check) => {
                        Err(FormatIssue::from_check(TableKind::Cues.name(), check, true))
                    }
                    None => Ok(()),
                }
            }
            Err(check) => Err(FormatIssue::from_check(TableKind::Cues.name(), check, false)),
        }
    }

    pub fn next_cue(&mut self) {
        self.navigator.next();
        self.refresh_snapshot();
    }

    pub fn previous_cue(&mut self) {
        self.navigator.previous();
        self.refresh_snapshot();
    }

    /// Jump to a cue group. Out-of-range targets change nothing and report
    /// failure for the operator message.
    pub fn warp_cue(&mut self, group: usize) -> bool {
        if self.navigator.warp(group) {
            self.refresh_snapshot();
            true
        } else {
            false
        }
    }

    /// Merge received node reports into the status table.
    pub fn apply_reports(&mut self, reports: &[NodeReport]) {
        self.nodes.apply_reports(reports);
    }

    /// Re-stamp every status row's staleness indicator.
    pub fn refresh_staleness(&mut self) {
        self.nodes.refresh_staleness(Utc::now());
    }

    /// Reset all tables back to the built-in templates.
    pub fn reset(&mut self) -> Result<(), FormatIssue> {
        self.replace_attributes(templates::attributes_template())?;
        self.replace_states(templates::states_template())?;
        self.replace_cues(templates::cues_template())
    }

    /// Save the raw tables as a named show folder.
    pub fn save_show(&self, name: &str) -> anyhow::Result<PathBuf> {
        self.show_manager.save_show(name, &self.show_tables())
    }

    /// Open a saved or example show and apply its three tables in order.
    /// The first format problem stops the remaining tables from being
    /// applied and is returned for the operator; a missing show is the
    /// distinguished invalid-input condition.
    pub fn open_show(
        &mut self,
        name: &str,
        example: bool,
    ) -> Result<Option<FormatIssue>, InvalidCommandInput> {
        let tables = if example {
            self.show_manager
                .open_example(name)
                .ok_or_else(|| InvalidCommandInput("example show was not found".to_string()))?
        } else {
            self.show_manager
                .open_show(name)
                .ok_or_else(|| InvalidCommandInput("saved show was not found".to_string()))?
        };

        for (kind, raw) in [
            (TableKind::Attributes, tables.attributes),
            (TableKind::States, tables.states),
            (TableKind::Cues, tables.cues),
        ] {
            if let Err(issue) = self.replace_table(kind, raw) {
                return Ok(Some(issue));
            }
        }
        Ok(None)
    }

    pub fn list_shows(&self) -> Vec<String> {
        self.show_manager.list_shows()
    }

    fn show_tables(&self) -> ShowTables {
        ShowTables {
            attributes: self.raw_attributes.clone(),
            states: self.raw_states.clone(),
            cues: self.raw_cues.clone(),
        }
    }

    /// Rebuild the current snapshot for the pointer's group and reset the
    /// node-status table to its empty shell. Runs after every navigation.
    fn refresh_snapshot(&mut self) {
        self.current = CurrentCues::for_group(&self.sequence, self.navigator.current());
        self.nodes = NodeStatusTable::shell_for(&self.current);
    }
}

fn load_or_template(store: &JsonStore<RawTable>, template: fn() -> RawTable) -> RawTable {
    let stored = store.load();
    if !stored.is_empty() {
        return stored;
    }
    let table = template();
    persist(store, &table);
    table
}

/// Raw tables are persisted best effort: the in-memory copy stays
/// authoritative and a failed write only costs durability across restarts.
fn persist(store: &JsonStore<RawTable>, table: &RawTable) {
    if let Err(err) = store.replace(table) {
        log::warn!("failed to persist table to {:?}: {:#}", store.path(), err);
    }
}
