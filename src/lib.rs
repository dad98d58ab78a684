pub mod amp;
pub mod cli;
pub mod concern;
pub mod config;
pub mod export;
pub mod logging;
pub mod run;
pub mod types;
