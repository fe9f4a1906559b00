//! Keeps a daily journal note up to date: creates it from a template, links it to the previous
//! entry, carries unfinished tasks forward and appends rolling summaries. Optionally copies
//! life-log records from a remote API and commits notes into git. Works once from the terminal or
//! on a daily schedule through a small daemon.

pub mod cli;
pub mod config;
pub mod context;
pub mod daemon;
pub mod error;
pub mod fs;
pub mod git;
pub mod journal;
pub mod lifelog;
pub mod summary;
pub mod utils;
