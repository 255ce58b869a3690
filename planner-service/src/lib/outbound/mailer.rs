pub mod sendgrid;
pub mod templates;
