mod products;
mod register;

pub use products::cmd_list_products;
pub use register::cmd_register_user;
