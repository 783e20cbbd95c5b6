pub mod prelude;

pub mod images;
pub mod products;
pub mod user_roles;
pub mod users;
