mod json_lines_replay;

pub use json_lines_replay::{JsonLinesReplay, ReplayStats};
