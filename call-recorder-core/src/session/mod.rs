pub mod diagnostic_log;
pub mod recorder;
