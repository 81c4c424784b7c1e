pub mod fake_directory;
pub mod fixtures;
