pub mod get;
pub mod health;
pub mod list;
pub mod serve;
pub mod set_version;
