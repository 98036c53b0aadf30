// Library exports for routelog

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod state;
