use crate::cue::cue_compiler::{ATTRIBUTE_COLUMNS, CUE_COLUMNS, STATE_COLUMNS};
use crate::table::RawTable;

/// Built-in starter tables, loaded on first run and by `/reset`. They are
/// mutually consistent: every template cue resolves against the template
/// attributes and states.
pub fn attributes_template() -> RawTable {
    let mut table = RawTable::new(ATTRIBUTE_COLUMNS.to_vec());
    table.push_row(vec!["02:ba:7c:10:00:01", "1", "Stage Left", "SL"]);
    table.push_row(vec!["02:ba:7c:10:00:02", "2", "Stage Right", "SR"]);
    table.push_row(vec!["02:ba:7c:10:00:03", "3", "Foyer", "F"]);
    table
}

pub fn states_template() -> RawTable {
    let mut table = RawTable::new(STATE_COLUMNS.to_vec());
    table.push_row(vec!["Standby", "Waiting", "Ready"]);
    table.push_row(vec!["Fire", "Ready", "Fired"]);
    table.push_row(vec!["Reset", "Fired", "Waiting"]);
    table
}

pub fn cues_template() -> RawTable {
    let mut table = RawTable::new(CUE_COLUMNS.to_vec());
    table.push_row(vec!["SL1", "house to half", "arm lamps", "Standby"]);
    table.push_row(vec!["SR1", "house to half", "arm lamps", "Standby"]);
    table.push_row(vec!["", "", "", ""]);
    table.push_row(vec!["SL2", "on go", "lamps up", "Fire"]);
    table.push_row(vec!["SR2", "with SL2", "lamps up", "Fire"]);
    table.push_row(vec!["", "", "", ""]);
    table.push_row(vec!["F1", "house open", "welcome loop", "Fire"]);
    table.push_row(vec!["", "", "", ""]);
    table.push_row(vec!["SL3", "curtain", "all out", "Reset"]);
    table.push_row(vec!["SR3", "curtain", "all out", "Reset"]);
    table.push_row(vec!["F2", "curtain", "all out", "Reset"]);
    table
}
