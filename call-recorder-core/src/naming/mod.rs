pub mod filename;
pub mod redactor;
pub mod template;
pub mod timestamp;
