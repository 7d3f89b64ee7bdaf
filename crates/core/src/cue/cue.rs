use serde::{Deserialize, Serialize};

/// Static identity and ownership record for one physical node on the mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub mac_address: String,
    pub node_number: String,
    pub node_name: String,
    pub cue_prefix: String,
}

/// One entry in the cue-state vocabulary: the state a cue can carry and the
/// node-state transition it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub cue_state: String,
    pub initial_node_state: String,
    pub final_node_state: String,
}

/// One timed action instruction, owned by exactly one node via its prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub group: usize,
    pub number: String,
    pub prefix: String,
    pub when: String,
    pub action: String,
    pub state: String,
}

/// The validated cue sequence: contiguous groups `0..=max_group` in script
/// order. Replaced wholesale by the compiler, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueSequence {
    groups: Vec<Vec<Cue>>,
}

impl CueSequence {
    pub fn from_groups(groups: Vec<Vec<Cue>>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Highest group number, or 0 for an empty sequence.
    pub fn max_group(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    pub fn group(&self, group: usize) -> &[Cue] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cues(&self) -> impl Iterator<Item = &Cue> {
        self.groups.iter().flatten()
    }

    pub fn get(&self, group: usize, number: &str) -> Option<&Cue> {
        // Last row wins when a group carries duplicate cue numbers.
        self.group(group)
            .iter()
            .rev()
            .find(|cue| cue.number == number)
    }
}

/// Derived, read-only snapshot of the cues in the current group, addressable
/// by owning prefix. Recomputed whenever the current group changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentCues {
    pub group: usize,
    pub cues: Vec<Cue>,
}

impl CurrentCues {
    pub fn for_group(sequence: &CueSequence, group: usize) -> Self {
        Self {
            group,
            cues: sequence.group(group).to_vec(),
        }
    }

    pub fn by_prefix(&self, prefix: &str) -> Option<&Cue> {
        self.cues.iter().find(|cue| cue.prefix == prefix)
    }

    pub fn contains_cue_number(&self, number: &str) -> bool {
        self.cues.iter().any(|cue| cue.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(group: usize, number: &str, prefix: &str) -> Cue {
        Cue {
            group,
            number: number.to_string(),
            prefix: prefix.to_string(),
            when: "on go".to_string(),
            action: "strike".to_string(),
            state: "Fire".to_string(),
        }
    }

    #[test]
    fn test_max_group_of_empty_sequence_is_zero() {
        assert_eq!(CueSequence::default().max_group(), 0);
    }

    #[test]
    fn test_snapshot_indexes_by_prefix() {
        let sequence = CueSequence::from_groups(vec![
            vec![cue(0, "SL1", "SL"), cue(0, "SR1", "SR")],
            vec![cue(1, "SL2", "SL")],
        ]);
        let current = CurrentCues::for_group(&sequence, 0);
        assert_eq!(current.by_prefix("SR").unwrap().number, "SR1");
        assert!(current.by_prefix("FX").is_none());

        let current = CurrentCues::for_group(&sequence, 1);
        assert_eq!(current.cues.len(), 1);
        assert!(current.contains_cue_number("SL2"));
    }
}
