pub mod accounts;
pub mod contacts;
pub mod memberships;
pub mod organizations;
pub mod password_reset;
pub mod users;

pub use users::{NewUser, User};
