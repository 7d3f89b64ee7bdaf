pub mod cue;
pub mod cue_compiler;
pub mod cue_navigator;
