pub mod redis_user;
