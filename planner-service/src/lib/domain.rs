pub mod deadline;
pub mod principal;
pub mod user;
