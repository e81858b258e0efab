pub mod attendance;
pub mod session;
pub mod settings;
pub mod user;
