pub mod email;
pub mod organization_id;
pub mod password;
pub mod role;
pub mod user_id;
pub mod username;

pub use email::Email;
pub use organization_id::OrganizationId;
pub use password::{HashedPassword, Password};
pub use role::Role;
pub use user_id::UserId;
pub use username::Username;
