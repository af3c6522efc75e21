use crate::domain::image::ImageUpload;
use crate::domain::post::PostRequest;
use crate::domain::DomainError;
use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;

const MAX_TEXT_PART_BYTES: usize = 64 * 1024;

/// Parsed body of a create/update post request.
///
/// Expects a `post` part holding the JSON request (or plain `title` and
/// `content` parts) and an optional `image` file part.
#[derive(Debug)]
pub struct PostForm {
    pub post: PostRequest,
    pub image: Option<ImageUpload>,
}

fn malformed(e: impl std::fmt::Display) -> DomainError {
    DomainError::ValidationError(format!("Malformed multipart body: {}", e))
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, DomainError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if bytes.len() + chunk.len() > limit {
            return Err(DomainError::ValidationError(format!(
                "Part exceeds maximum size of {} bytes",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_text(field: &mut Field) -> Result<String, DomainError> {
    let bytes = read_field(field, MAX_TEXT_PART_BYTES).await?;
    String::from_utf8(bytes).map_err(malformed)
}

pub async fn read_post_form(
    mut payload: Multipart,
    max_image_bytes: usize,
) -> Result<PostForm, DomainError> {
    let mut post: Option<PostRequest> = None;
    let mut title = None;
    let mut content = None;
    let mut image = None;

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "post" => {
                let raw = read_text(&mut field).await?;
                post = Some(serde_json::from_str(&raw).map_err(|e| {
                    DomainError::ValidationError(format!("Invalid post part: {}", e))
                })?);
            }
            "title" => title = Some(read_text(&mut field).await?),
            "content" => content = Some(read_text(&mut field).await?),
            "image" => {
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("image")
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_default();
                let bytes = read_field(&mut field, max_image_bytes).await?;

                // browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            other => {
                tracing::debug!("Ignoring multipart field '{}'", other);
                read_field(&mut field, MAX_TEXT_PART_BYTES).await?;
            }
        }
    }

    let post = match (post, title, content) {
        (Some(post), _, _) => post,
        (None, Some(title), Some(content)) => PostRequest { title, content },
        _ => {
            return Err(DomainError::ValidationError(
                "Missing 'post' part".to_string(),
            ))
        }
    };

    Ok(PostForm { post, image })
}
