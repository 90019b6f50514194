pub mod compute;
pub mod db;
pub mod settings;
pub mod trigger;
