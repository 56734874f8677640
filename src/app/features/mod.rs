pub mod accounts;
pub mod admin;
pub mod auth;
pub mod choose_org;
pub mod dashboard;
pub mod organization;
