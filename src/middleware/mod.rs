pub mod auth;
pub mod deadline;
pub mod headers;
pub mod panic;
pub mod trace;
