use chrono::{DateTime, Utc};

use super::validation::{
    MAX_AUTHOR_LENGTH, MAX_GENRE_LENGTH, ValidationError, validate_image_content_type,
    validate_optional_len, validate_price, validate_title,
};
use super::{ImageId, ProductId, UserId};

/// A catalog entry. Owns its images exclusively; `preview_image_id` is a
/// plain reference into `images`, not a second ownership edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub date_of_created: DateTime<Utc>,
    pub images: Vec<Image>,
    pub preview_image_id: Option<ImageId>,
    pub owner: UserId,
}

impl Product {
    #[must_use]
    pub fn preview_image(&self) -> Option<&Image> {
        let preview = self.preview_image_id?;
        self.images.iter().find(|image| image.id == preview)
    }

    /// True when `preview_image_id` is set and names one of `images`.
    #[must_use]
    pub fn has_valid_preview(&self) -> bool {
        self.preview_image().is_some()
    }
}

/// Binary image payload; cannot exist without its product.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub id: ImageId,
    pub product_id: ProductId,
    pub name: String,
    pub original_filename: String,
    pub content_type: String,
    pub size: i64,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("product_id", &self.product_id)
            .field("name", &self.name)
            .field("original_filename", &self.original_filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// The editable scalar fields of a product, used for both create and update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductDetails {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub genre: Option<String>,
    pub author: Option<String>,
}

impl ProductDetails {
    /// Blank optional text becomes `None`; the title keeps its spelling.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            title: self.title,
            description: non_blank(self.description),
            price: self.price,
            genre: non_blank(self.genre),
            author: non_blank(self.author),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_price(self.price)?;
        validate_optional_len("genre", self.genre.as_deref(), MAX_GENRE_LENGTH)?;
        validate_optional_len("author", self.author.as_deref(), MAX_AUTHOR_LENGTH)?;
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// What the upload boundary hands over for an image attachment.
#[derive(Clone)]
pub struct ImageUpload {
    /// Form field the file arrived in.
    pub field_name: String,
    pub declared_content_type: Option<String>,
    pub original_filename: String,
    pub declared_size: i64,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("field_name", &self.field_name)
            .field("declared_content_type", &self.declared_content_type)
            .field("original_filename", &self.original_filename)
            .field("declared_size", &self.declared_size)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// A validated image that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub name: String,
    pub original_filename: String,
    pub content_type: String,
    pub size: i64,
    pub bytes: Vec<u8>,
    pub preview_candidate: bool,
}

impl NewImage {
    pub fn from_upload(upload: ImageUpload) -> Result<Self, ValidationError> {
        validate_image_content_type(upload.declared_content_type.as_deref())?;

        if upload.bytes.is_empty() {
            return Err(ValidationError::new("file", "Image file cannot be empty"));
        }

        if upload.field_name.trim().is_empty() {
            return Err(ValidationError::new("name", "Image name cannot be empty"));
        }

        if upload.original_filename.trim().is_empty() {
            return Err(ValidationError::new(
                "original_filename",
                "Original file name cannot be empty",
            ));
        }

        let actual = i64::try_from(upload.bytes.len())
            .map_err(|_| ValidationError::new("size", "Image is too large"))?;
        if upload.declared_size != actual {
            return Err(ValidationError::new(
                "size",
                format!(
                    "Declared size {} does not match payload length {actual}",
                    upload.declared_size
                ),
            ));
        }

        Ok(Self {
            name: upload.field_name,
            original_filename: upload.original_filename,
            // Checked above.
            content_type: upload.declared_content_type.unwrap_or_default(),
            size: actual,
            bytes: upload.bytes,
            preview_candidate: false,
        })
    }

    #[must_use]
    pub const fn as_preview_candidate(mut self) -> Self {
        self.preview_candidate = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            field_name: "file1".to_string(),
            declared_content_type: Some(content_type.to_string()),
            original_filename: "cover.png".to_string(),
            declared_size: i64::try_from(bytes.len()).unwrap(),
            bytes: bytes.to_vec(),
        }
    }

    fn image(id: i64) -> Image {
        Image {
            id: ImageId::new(id),
            product_id: ProductId::new(1),
            name: "file1".to_string(),
            original_filename: "a.png".to_string(),
            content_type: "image/png".to_string(),
            size: 1,
            bytes: vec![1],
        }
    }

    #[test]
    fn upload_with_image_type_is_accepted() {
        let image = NewImage::from_upload(upload("image/png", b"\x89PNG"))
            .unwrap()
            .as_preview_candidate();
        assert_eq!(image.size, 4);
        assert_eq!(image.name, "file1");
        assert!(image.preview_candidate);
    }

    #[test]
    fn upload_with_text_type_is_rejected() {
        let err = NewImage::from_upload(upload("text/plain", b"hello")).unwrap_err();
        assert_eq!(err.field, "content_type");
    }

    #[test]
    fn empty_or_mismatched_upload_is_rejected() {
        assert_eq!(
            NewImage::from_upload(upload("image/png", b"")).unwrap_err().field,
            "file"
        );

        let mut lying = upload("image/png", b"abc");
        lying.declared_size = 10;
        assert_eq!(NewImage::from_upload(lying).unwrap_err().field, "size");

        let mut nameless = upload("image/png", b"abc");
        nameless.original_filename = " ".to_string();
        assert_eq!(
            NewImage::from_upload(nameless).unwrap_err().field,
            "original_filename"
        );
    }

    #[test]
    fn details_normalize_blank_optionals() {
        let details = ProductDetails {
            title: "Dune".to_string(),
            description: Some("  ".to_string()),
            price: 10.0,
            genre: Some(String::new()),
            author: Some("Herbert".to_string()),
        }
        .normalized();

        assert_eq!(details.description, None);
        assert_eq!(details.genre, None);
        assert_eq!(details.author.as_deref(), Some("Herbert"));
        assert!(details.validate().is_ok());
    }

    #[test]
    fn preview_must_reference_an_owned_image() {
        let mut product = Product {
            id: ProductId::new(1),
            title: "Dune".to_string(),
            description: None,
            price: 10.0,
            genre: None,
            author: None,
            date_of_created: Utc::now(),
            images: vec![image(5), image(6)],
            preview_image_id: None,
            owner: UserId::new(1),
        };
        assert!(!product.has_valid_preview());

        product.preview_image_id = Some(ImageId::new(6));
        assert_eq!(product.preview_image().map(|i| i.id), Some(ImageId::new(6)));

        product.preview_image_id = Some(ImageId::new(99));
        assert!(!product.has_valid_preview());
    }
}
