pub mod gnome;
pub mod kwin;
pub mod monitor;
pub mod native;
pub mod parser;
pub mod snapshot;
