//! Domain types for the catalog aggregate with strong typing.
//!
//! Identifiers are newtypes so that a `ProductId` can never be passed where an
//! `ImageId` is expected. Entities live in [`user`] and [`product`]; boundary
//! checks live in [`validation`] (caller input) and [`invariants`] (data that
//! crossed the storage boundary).

pub mod invariants;
pub mod product;
pub mod user;
pub mod validation;

pub use invariants::ConsistencyViolation;
pub use product::{Image, ImageUpload, NewImage, Product, ProductDetails};
pub use user::{Role, User};
pub use validation::ValidationError;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying store-assigned value.
            #[must_use]
            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self::new(id)
            }
        }
    };
}

entity_id!(
    /// Store-assigned identity of a registered user.
    UserId
);

entity_id!(
    /// Store-assigned identity of a product, allocated on first persist.
    ProductId
);

entity_id!(
    /// Store-assigned identity of an image owned by exactly one product.
    ImageId
);
