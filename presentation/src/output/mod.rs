//! Terminal formatting and the HTML preview file

pub mod console;
pub mod preview;
