//! Admin editor for blog posts. Posts save in one request, so there is no
//! reconciliation step: a new post is created, an existing one is updated in place.

use shared::{
    domain::{BlogPostDetail, MediaId, PostId, PostStatus, TagId},
    protocol::CreatePostRequest,
};
use tracing::info;

use crate::{
    error::ClientError,
    validation::{self, ValidationErrors},
    AdminApi,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostEditor {
    post_id: Option<PostId>,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub cover_image_id: Option<MediaId>,
    pub tag_ids: Vec<TagId>,
    pub status: PostStatus,
    errors: ValidationErrors,
}

impl PostEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_post(post: BlogPostDetail) -> Self {
        Self {
            post_id: Some(post.id),
            title: post.title,
            excerpt: post.excerpt,
            body: post.body,
            cover_image_id: post.cover_image.map(|asset| asset.id),
            tag_ids: post.tags.iter().map(|tag| tag.id).collect(),
            status: post.status,
            errors: ValidationErrors::new(),
        }
    }

    pub fn post_id(&self) -> Option<PostId> {
        self.post_id
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn toggle_tag(&mut self, tag_id: TagId) {
        if let Some(pos) = self.tag_ids.iter().position(|id| *id == tag_id) {
            self.tag_ids.remove(pos);
        } else {
            self.tag_ids.push(tag_id);
        }
    }

    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        let result = validation::validate_post(&self.title, &self.excerpt, &self.body);
        self.errors = result.clone().err().unwrap_or_default();
        result
    }

    /// Saves with the given status, which also becomes the editor's status on success.
    pub async fn save(
        &mut self,
        api: &dyn AdminApi,
        status: PostStatus,
    ) -> Result<BlogPostDetail, ClientError> {
        self.validate()?;
        let request = CreatePostRequest {
            title: self.title.trim().to_string(),
            excerpt: self.excerpt.trim().to_string(),
            body: self.body.clone(),
            cover_image_id: self.cover_image_id,
            tag_ids: self.tag_ids.clone(),
            status,
        };

        let saved = match self.post_id {
            Some(post_id) => api.update_post(post_id, &request.into()).await?,
            None => api.create_post(&request).await?,
        };
        info!(post_id = saved.id.0, slug = %saved.slug, ?status, "post saved");
        self.post_id = Some(saved.id);
        self.status = saved.status;
        Ok(saved)
    }
}
