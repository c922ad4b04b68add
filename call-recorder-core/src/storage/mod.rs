pub mod fs_storage;
pub mod lifecycle;
pub mod metadata;
pub mod retention;
