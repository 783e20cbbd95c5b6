pub use super::images::Entity as Images;
pub use super::products::Entity as Products;
pub use super::user_roles::Entity as UserRoles;
pub use super::users::Entity as Users;
