// Output formatting: terminal display and report files.

pub mod report;
pub mod terminal;
