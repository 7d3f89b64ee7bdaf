use crate::cue::cue::{Attribute, Cue, CueSequence, State};
use crate::errors::FormatCheck;
use crate::table::RawTable;

pub const CUE_COLUMNS: [&str; 4] = ["Cue Number", "When", "Action", "Cue State"];
pub const ATTRIBUTE_COLUMNS: [&str; 4] = ["MAC Address", "Node Number", "Node Name", "Cue Prefix"];
pub const STATE_COLUMNS: [&str; 3] = ["Cue State", "Initial Node State", "Final Node State"];

/// A successful cue compilation. `warning` carries a recoverable problem
/// the caller must surface even though the sequence was built.
#[derive(Debug, Clone)]
pub struct CueCompilation {
    pub sequence: CueSequence,
    pub warning: Option<FormatCheck>,
}

/// Validate and transform a raw cue script into the grouped cue sequence.
///
/// Rows are partitioned into contiguous runs separated by fully blank rows;
/// run `i` becomes group `i`. Leading, trailing, and repeated blank rows
/// never produce empty groups. Group and prefix assignment happen in a
/// single forward pass over the rows.
pub fn compile_cues(
    raw: &RawTable,
    attributes: &[Attribute],
    states: &[State],
) -> Result<CueCompilation, FormatCheck> {
    check_columns(raw, &CUE_COLUMNS)?;

    let number_col = raw.column_index("Cue Number").unwrap();
    let when_col = raw.column_index("When").unwrap();
    let action_col = raw.column_index("Action").unwrap();
    let state_col = raw.column_index("Cue State").unwrap();

    let mut groups: Vec<Vec<Cue>> = Vec::new();
    let mut in_run = false;
    let mut warning = None;

    for row in &raw.rows {
        if RawTable::is_blank_row(row) {
            in_run = false;
            continue;
        }
        if !in_run {
            groups.push(Vec::new());
            in_run = true;
        }
        let group = groups.len() - 1;

        let number = cell(row, number_col).to_string();
        let prefix = resolve_prefix(&number, attributes)?;
        let state = cell(row, state_col).to_string();
        if !states.iter().any(|s| s.cue_state == state) {
            return Err(FormatCheck::error(
                "cue states",
                ". Make sure the cue states you entered for this sheet match the cue states \
                 in the states sheet.",
            ));
        }

        let run = &mut groups[group];
        if warning.is_none() && run.iter().any(|cue| cue.number == number) {
            warning = Some(FormatCheck::warning(
                format!("cue numbers ({})", number),
                " because the same cue number appears more than once in a group, and only \
                 the last row will be used.",
            ));
        }
        run.push(Cue {
            group,
            number,
            prefix,
            when: cell(row, when_col).to_string(),
            action: cell(row, action_col).to_string(),
            state,
        });
    }

    Ok(CueCompilation {
        sequence: CueSequence::from_groups(groups),
        warning,
    })
}

/// Derive a row's prefix by stripping digits and dots from its cue number,
/// then resolve it against the attributes table. Anything other than exactly
/// one match is fatal: the attributes sheet is the likely culprit.
fn resolve_prefix(cue_number: &str, attributes: &[Attribute]) -> Result<String, FormatCheck> {
    let candidate: String = cue_number
        .chars()
        .filter(|ch| !ch.is_ascii_digit() && *ch != '.')
        .collect();

    let matches = attributes
        .iter()
        .filter(|attribute| attribute.cue_prefix == candidate)
        .count();
    if matches == 1 {
        Ok(candidate)
    } else {
        Err(FormatCheck::error(
            format!("cue prefix ({})", cue_number),
            " and you should make sure you assigned a node the prefix in the attributes \
             sheet.",
        ))
    }
}

/// Validate and read the attributes table.
pub fn compile_attributes(raw: &RawTable) -> Result<Vec<Attribute>, FormatCheck> {
    check_columns(raw, &ATTRIBUTE_COLUMNS)?;

    let mac_col = raw.column_index("MAC Address").unwrap();
    let number_col = raw.column_index("Node Number").unwrap();
    let name_col = raw.column_index("Node Name").unwrap();
    let prefix_col = raw.column_index("Cue Prefix").unwrap();

    Ok(raw
        .rows
        .iter()
        .filter(|row| !RawTable::is_blank_row(row))
        .map(|row| Attribute {
            mac_address: cell(row, mac_col).to_string(),
            node_number: cell(row, number_col).to_string(),
            node_name: cell(row, name_col).to_string(),
            cue_prefix: cell(row, prefix_col).to_string(),
        })
        .collect())
}

/// Validate and read the states table.
pub fn compile_states(raw: &RawTable) -> Result<Vec<State>, FormatCheck> {
    check_columns(raw, &STATE_COLUMNS)?;

    let state_col = raw.column_index("Cue State").unwrap();
    let initial_col = raw.column_index("Initial Node State").unwrap();
    let final_col = raw.column_index("Final Node State").unwrap();

    Ok(raw
        .rows
        .iter()
        .filter(|row| !RawTable::is_blank_row(row))
        .map(|row| State {
            cue_state: cell(row, state_col).to_string(),
            initial_node_state: cell(row, initial_col).to_string(),
            final_node_state: cell(row, final_col).to_string(),
        })
        .collect())
}

/// Tables handed over by the presentation layer may be ragged; missing
/// cells read as blank.
fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("").trim()
}

fn check_columns(raw: &RawTable, expected: &[&str]) -> Result<(), FormatCheck> {
    if raw.has_columns(expected) {
        Ok(())
    } else {
        Err(FormatCheck::error(
            "column titles",
            format!(
                " because they do not consist of the following: {}",
                expected.join(", ")
            ),
        ))
    }
}
