//! Aggregate invariants re-checked whenever an entity crosses the storage
//! boundary (after a read, before a write). A failure here means the stored
//! data was corrupted outside the normal write path; nothing is repaired.

use thiserror::Error;

use super::{Image, Product, User};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} #{id} is inconsistent: {field} {reason}")]
pub struct ConsistencyViolation {
    pub entity: &'static str,
    pub id: i64,
    pub field: &'static str,
    pub reason: &'static str,
}

impl ConsistencyViolation {
    const fn new(entity: &'static str, id: i64, field: &'static str, reason: &'static str) -> Self {
        Self {
            entity,
            id,
            field,
            reason,
        }
    }
}

pub fn check_user(user: &User) -> Result<(), ConsistencyViolation> {
    let id = user.id.value();

    if user.username.trim().is_empty() {
        return Err(ConsistencyViolation::new("user", id, "username", "is empty"));
    }
    if user.password_hash.trim().is_empty() {
        return Err(ConsistencyViolation::new(
            "user",
            id,
            "password_hash",
            "is empty",
        ));
    }
    if user.roles.is_empty() {
        return Err(ConsistencyViolation::new("user", id, "roles", "is empty"));
    }

    Ok(())
}

/// Checks the product, every owned image, and the preview reference.
pub fn check_product(product: &Product) -> Result<(), ConsistencyViolation> {
    let id = product.id.value();

    if product.title.trim().is_empty() {
        return Err(ConsistencyViolation::new("product", id, "title", "is empty"));
    }
    if !product.price.is_finite() || product.price <= 0.0 {
        return Err(ConsistencyViolation::new(
            "product",
            id,
            "price",
            "is not positive",
        ));
    }
    if product.owner.value() <= 0 {
        return Err(ConsistencyViolation::new(
            "product",
            id,
            "user",
            "has no owner",
        ));
    }

    for image in &product.images {
        check_image(image)?;
        if image.product_id != product.id {
            return Err(ConsistencyViolation::new(
                "image",
                image.id.value(),
                "product",
                "belongs to another product",
            ));
        }
    }

    if product.preview_image_id.is_some() && !product.has_valid_preview() {
        return Err(ConsistencyViolation::new(
            "product",
            id,
            "preview_image_id",
            "references an image the product does not own",
        ));
    }

    Ok(())
}

pub fn check_image(image: &Image) -> Result<(), ConsistencyViolation> {
    let id = image.id.value();

    if image.name.trim().is_empty() {
        return Err(ConsistencyViolation::new("image", id, "name", "is empty"));
    }
    if image.original_filename.trim().is_empty() {
        return Err(ConsistencyViolation::new(
            "image",
            id,
            "original_filename",
            "is empty",
        ));
    }
    if !image.content_type.starts_with("image/") {
        return Err(ConsistencyViolation::new(
            "image",
            id,
            "content_type",
            "is not an image type",
        ));
    }
    if image.size <= 0 {
        return Err(ConsistencyViolation::new(
            "image",
            id,
            "size",
            "is not positive",
        ));
    }
    if image.bytes.is_empty() {
        return Err(ConsistencyViolation::new("image", id, "bytes", "is empty"));
    }
    if image.product_id.value() <= 0 {
        return Err(ConsistencyViolation::new(
            "image",
            id,
            "product",
            "has no owning product",
        ));
    }

    Ok(())
}
