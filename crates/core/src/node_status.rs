use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cue::cue::CurrentCues;

/// A status update broadcast back by a remote node after it observes a cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub cue_number: String,
    pub node_number: String,
    pub node_state: String,
    pub timestamp: DateTime<Utc>,
}

/// One row of the live node-status table: the cue fields copied from the
/// current snapshot plus the node fields filled in as reports arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub cue_number: String,
    pub when: String,
    pub action: String,
    pub cue_state: String,
    pub node_number: String,
    pub node_state: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub last_updated: String,
}

/// Live per-cue node statuses for the current group. Rebuilt as an empty
/// shell on every navigation; merged incrementally from reports in between.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStatusTable {
    rows: Vec<NodeStatus>,
}

impl NodeStatusTable {
    /// The empty shell for a snapshot: one row per cue, node fields blank.
    pub fn shell_for(current: &CurrentCues) -> Self {
        Self {
            rows: current
                .cues
                .iter()
                .map(|cue| NodeStatus {
                    cue_number: cue.number.clone(),
                    when: cue.when.clone(),
                    action: cue.action.clone(),
                    cue_state: cue.state.clone(),
                    node_number: String::new(),
                    node_state: String::new(),
                    timestamp: None,
                    last_updated: String::new(),
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[NodeStatus] {
        &self.rows
    }

    pub fn get(&self, cue_number: &str) -> Option<&NodeStatus> {
        self.rows.iter().find(|row| row.cue_number == cue_number)
    }

    /// Merge incoming reports. A report only lands on a row whose cue number
    /// is in the current table; anything else is a stale report from a prior
    /// group and is dropped.
    pub fn apply_reports(&mut self, reports: &[NodeReport]) {
        for report in reports {
            let Some(row) = self
                .rows
                .iter_mut()
                .find(|row| row.cue_number == report.cue_number)
            else {
                log::debug!(
                    "dropping report for cue {:?} outside the current group",
                    report.cue_number
                );
                continue;
            };
            row.node_number = report.node_number.clone();
            row.node_state = report.node_state.clone();
            row.timestamp = Some(report.timestamp);
            row.last_updated = format_last_updated(Utc::now(), report.timestamp);
        }
    }

    /// Recompute every row's staleness display. Pure projection of the
    /// stored timestamps; safe to call on any schedule.
    pub fn refresh_staleness(&mut self, now: DateTime<Utc>) {
        for row in &mut self.rows {
            row.last_updated = match row.timestamp {
                Some(timestamp) => format_last_updated(now, timestamp),
                None => String::new(),
            };
        }
    }
}

/// Render the minutes since a report as the operator-facing staleness
/// indicator. Ages beyond 99 minutes all read the same.
pub fn format_last_updated(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();
    if minutes <= 99 {
        format!("{} min", minutes.max(0))
    } else {
        ">99 min".to_string()
    }
}
