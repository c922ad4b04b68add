pub mod capture_source;
pub mod clock;
pub mod codec;
pub mod log_capture;
pub mod recording_listener;
pub mod storage;
