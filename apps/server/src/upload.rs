//! Multipart upload helpers.
//!
//! ```text
//! POST /products (multipart)     image  ──► {uploads}/products/{millis}-{uuid}.{ext}
//! POST /*/import                 csv    ──► {uploads}/imports/{millis}-{uuid}.csv
//! POST /system/import            backup ──► in memory
//! ```
//!
//! Staged CSV files are removed once their import commits. A failed import
//! leaves the file in place and logs its path.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};
use chrono::Utc;
use tally_core::{Money, ProductInput, ValidationError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Public URL prefix for files under the uploads directory.
pub const UPLOADS_URL: &str = "/uploads";

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::validation(format!("Malformed upload: {}", err.body_text()))
}

fn unique_name(ext: &str) -> String {
    format!("{}-{}.{}", Utc::now().timestamp_millis(), Uuid::new_v4(), ext)
}

async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::storage("Failed to prepare upload directory", e))?;

    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| ApiError::storage("Failed to save upload", e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Upload saved");
    Ok(path)
}

// =============================================================================
// Product Images
// =============================================================================

/// Reads a product form: text fields mirror the JSON body, `image` is the
/// optional picture.
pub async fn product_form(
    mut multipart: Multipart,
    uploads_dir: &Path,
    max_image_bytes: usize,
) -> Result<ProductInput, ApiError> {
    let mut input = ProductInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            if let Some(url) = save_image(field, uploads_dir, max_image_bytes).await? {
                input.image_url = Some(url);
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        apply_product_field(&mut input, &name, value)?;
    }

    Ok(input)
}

fn apply_product_field(
    input: &mut ProductInput,
    name: &str,
    value: String,
) -> Result<(), ValidationError> {
    let present = !value.trim().is_empty();
    match name {
        "name" => input.name = value,
        "sku" => input.sku = Some(value),
        "category" => input.category = Some(value),
        "description" => input.description = Some(value),
        "imageUrl" => input.image_url = Some(value),
        "price" if present => input.price = Some(Money::parse_decimal(value.trim())?),
        "costPrice" if present => input.cost_price = Some(Money::parse_decimal(value.trim())?),
        "quantity" if present => {
            let quantity = value.trim().parse().map_err(|_| ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: format!("'{}' is not a whole number", value.trim()),
            })?;
            input.quantity = Some(quantity);
        }
        _ => {}
    }
    Ok(())
}

/// Saves an image field and returns its public URL. An empty file part
/// (form submitted without a picture) yields `None`.
async fn save_image(
    field: Field<'_>,
    uploads_dir: &Path,
    max_image_bytes: usize,
) -> Result<Option<String>, ApiError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    let file_name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;

    if bytes.is_empty() {
        return Ok(None);
    }
    if !content_type.starts_with("image/") {
        return Err(ApiError::validation("Only image files are allowed"));
    }
    if bytes.len() > max_image_bytes {
        return Err(ApiError::validation(format!(
            "Image exceeds {} bytes",
            max_image_bytes
        )));
    }

    let ext = image_extension(&file_name, &content_type);
    let name = unique_name(&ext);
    write_file(&uploads_dir.join("products"), &name, &bytes).await?;

    Ok(Some(format!("{}/products/{}", UPLOADS_URL, name)))
}

/// Extension from the file name, else from the MIME subtype.
fn image_extension(file_name: &str, content_type: &str) -> String {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string);
    let from_mime = content_type
        .strip_prefix("image/")
        .map(|sub| sub.split('+').next().unwrap_or(sub).to_string());

    from_name
        .or(from_mime)
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

// =============================================================================
// CSV Imports
// =============================================================================

/// A CSV upload written to the staging directory.
#[derive(Debug)]
pub struct StagedUpload {
    pub path: PathBuf,
}

impl StagedUpload {
    pub async fn read(&self) -> Result<Vec<u8>, ApiError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ApiError::storage("Failed to read upload", e))
    }

    /// Removes the file after a commit, keeps it otherwise.
    pub async fn settle(self, committed: bool) {
        if !committed {
            warn!(path = %self.path.display(), "Import failed, upload retained");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

/// Stages the `csv` field of an import form.
pub async fn stage_csv(mut multipart: Multipart, uploads_dir: &Path) -> Result<StagedUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("csv") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_csv(&file_name, &content_type) {
            return Err(ApiError::validation("Only CSV files are allowed"));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        let path = write_file(&uploads_dir.join("imports"), &unique_name("csv"), &bytes).await?;
        info!(path = %path.display(), original = %file_name, "CSV upload staged");
        return Ok(StagedUpload { path });
    }

    Err(ApiError::validation("No file uploaded"))
}

fn is_csv(file_name: &str, content_type: &str) -> bool {
    content_type == "text/csv" || file_name.to_ascii_lowercase().ends_with(".csv")
}

// =============================================================================
// Backups
// =============================================================================

/// Reads the `backup` field of a restore form.
pub async fn backup_file(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("backup") {
            let bytes = field.bytes().await.map_err(multipart_error)?;
            return Ok(bytes.to_vec());
        }
    }

    Err(ApiError::validation("No file uploaded"))
}
