pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod rate_limit;

pub use domain::user;
pub use outbound::repositories;
