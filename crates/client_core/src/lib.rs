use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        BlogPostDetail, BlogPostSummary, ListId, MediaAsset, MediaId, PostId, RankedEntry,
        RankedList, RankedListSummary, Suggestion, SuggestionId, SuggestionStatus,
    },
    error::ApiError,
    protocol::{
        CreateEntryRequest, CreateListRequest, CreatePostRequest, CreateSuggestionRequest,
        EntryRankUpdate, Page, PageQuery, UpdateListRequest, UpdatePostRequest,
        UpdateSuggestionStatusRequest,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use url::Url;

pub mod error;
pub mod list_editor;
pub mod pagination;
pub mod post_editor;
pub mod reveal;
pub mod session;
pub mod suggestions;
pub mod validation;

pub use error::ClientError;
pub use list_editor::{EntryDraft, EntryRef, ListEditor, LocalHandle, SaveOutcome};
pub use reveal::RevealController;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};

use validation::ValidationErrors;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Admin endpoint used to check credentials at login.
const LOGIN_PROBE_PATH: [&str; 2] = ["admin", "suggestions"];
pub const MEDIA_LIBRARY_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    SessionStarted,
    SessionEnded,
    /// The backend answered 401; the stored token is gone and the operator must log in.
    SessionExpired,
}

#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub alt_text: Option<String>,
}

impl MediaUpload {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validation::validate_media_upload(&self.content_type, self.bytes.len() as u64)
    }
}

#[async_trait]
pub trait PublicApi: Send + Sync {
    async fn fetch_list(&self, slug: &str) -> ClientResult<RankedList>;
    async fn fetch_list_entries(&self, slug: &str) -> ClientResult<Vec<RankedEntry>>;
    async fn list_lists(&self, query: &PageQuery) -> ClientResult<Page<RankedListSummary>>;
    async fn list_posts(&self, query: &PageQuery) -> ClientResult<Page<BlogPostSummary>>;
    async fn fetch_post(&self, slug: &str) -> ClientResult<BlogPostDetail>;
    async fn list_media(&self, query: &PageQuery) -> ClientResult<Page<MediaAsset>>;
    async fn create_suggestion(&self, request: &CreateSuggestionRequest)
        -> ClientResult<Suggestion>;
}

#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn create_list(&self, request: &CreateListRequest) -> ClientResult<RankedList>;
    async fn update_list(
        &self,
        list_id: ListId,
        request: &UpdateListRequest,
    ) -> ClientResult<RankedList>;
    async fn delete_list(&self, list_id: ListId) -> ClientResult<()>;
    async fn add_entry(
        &self,
        list_id: ListId,
        request: &CreateEntryRequest,
    ) -> ClientResult<RankedEntry>;
    async fn reorder_entries(&self, list_id: ListId, updates: &[EntryRankUpdate])
        -> ClientResult<()>;
    async fn create_post(&self, request: &CreatePostRequest) -> ClientResult<BlogPostDetail>;
    async fn update_post(
        &self,
        post_id: PostId,
        request: &UpdatePostRequest,
    ) -> ClientResult<BlogPostDetail>;
    async fn delete_post(&self, post_id: PostId) -> ClientResult<()>;
    async fn upload_media(&self, upload: MediaUpload) -> ClientResult<MediaAsset>;
    async fn delete_media(&self, media_id: MediaId) -> ClientResult<()>;
    async fn list_suggestions(&self) -> ClientResult<Vec<Suggestion>>;
    async fn update_suggestion_status(
        &self,
        suggestion_id: SuggestionId,
        status: SuggestionStatus,
    ) -> ClientResult<Suggestion>;
}

/// REST client for the layerten backend. Public calls need no session; admin calls
/// attach the injected [`Session`] and drop it on the first 401.
pub struct LayerTenClient {
    http: Client,
    base_url: Url,
    session: Mutex<Option<Session>>,
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<ClientEvent>,
}

impl LayerTenClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::new_with_dependencies(base_url, None, Arc::new(MemorySessionStore::default()))
    }

    pub fn new_with_session(base_url: &str, session: Session) -> ClientResult<Self> {
        Self::new_with_dependencies(
            base_url,
            Some(session),
            Arc::new(MemorySessionStore::default()),
        )
    }

    /// Restores a previously persisted session from `store`, if any.
    pub fn new_with_session_store(
        base_url: &str,
        store: Arc<dyn SessionStore>,
    ) -> ClientResult<Self> {
        let session = match store.load() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable stored session");
                None
            }
        };
        Self::new_with_dependencies(base_url, session, store)
    }

    pub fn new_with_dependencies(
        base_url: &str,
        session: Option<Session>,
        store: Arc<dyn SessionStore>,
    ) -> ClientResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            http: Client::new(),
            base_url,
            session: Mutex::new(session),
            store,
            events,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Probes an admin endpoint with the credentials and, on success, installs and
    /// persists the session.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let session = Session::from_credentials(username, password);
        let url = self.endpoint(&LOGIN_PROBE_PATH)?;
        let res = self
            .http
            .get(url)
            .header(AUTHORIZATION, session.authorization_header())
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "admin login rejected");
            return Err(ClientError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(api_error(res).await.into());
        }

        self.store
            .save(&session)
            .map_err(ClientError::SessionStorage)?;
        *self.session.lock().await = Some(session);
        info!(username, "admin session started");
        let _ = self.events.send(ClientEvent::SessionStarted);
        Ok(())
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.session.lock().await.take();
        self.store.clear().map_err(ClientError::SessionStorage)?;
        info!("admin session ended");
        let _ = self.events.send(ClientEvent::SessionEnded);
        Ok(())
    }

    async fn expire_session(&self) {
        self.session.lock().await.take();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear stored session after 401");
        }
        warn!("admin session expired");
        let _ = self.events.send(ClientEvent::SessionExpired);
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn admin_request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let header = self
            .session
            .lock()
            .await
            .as_ref()
            .map(Session::authorization_header)
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(self.http.request(method, url).header(AUTHORIZATION, header))
    }

    async fn execute(&self, request: RequestBuilder, admin: bool) -> ClientResult<Response> {
        let request = request.build()?;
        debug!(method = %request.method(), url = %request.url(), "backend request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if admin && status == StatusCode::UNAUTHORIZED {
            self.expire_session().await;
            return Err(ClientError::SessionExpired);
        }
        if !status.is_success() {
            let err = api_error(res).await;
            warn!(status = err.status, message = %err.message, "backend request failed");
            return Err(err.into());
        }
        Ok(res)
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Option<&PageQuery>,
    ) -> ClientResult<T> {
        let mut request = self.http.get(self.endpoint(segments)?);
        if let Some(query) = query {
            request = request.query(query);
        }
        Ok(self.execute(request, false).await?.json().await?)
    }

    async fn admin_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        Ok(self.execute(request, true).await?.json().await?)
    }

    async fn admin_empty(&self, request: RequestBuilder) -> ClientResult<()> {
        self.execute(request, true).await?;
        Ok(())
    }
}

fn normalize_base_url(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

async fn api_error(res: Response) -> ApiError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    ApiError::from_body(status, &body)
}

#[async_trait]
impl PublicApi for LayerTenClient {
    async fn fetch_list(&self, slug: &str) -> ClientResult<RankedList> {
        let mut list: RankedList = self.get_public(&["lists", slug], None).await?;
        list.sort_entries_by_rank();
        Ok(list)
    }

    async fn fetch_list_entries(&self, slug: &str) -> ClientResult<Vec<RankedEntry>> {
        self.get_public(&["lists", slug, "entries"], None).await
    }

    async fn list_lists(&self, query: &PageQuery) -> ClientResult<Page<RankedListSummary>> {
        self.get_public(&["lists"], Some(query)).await
    }

    async fn list_posts(&self, query: &PageQuery) -> ClientResult<Page<BlogPostSummary>> {
        self.get_public(&["posts"], Some(query)).await
    }

    async fn fetch_post(&self, slug: &str) -> ClientResult<BlogPostDetail> {
        self.get_public(&["posts", slug], None).await
    }

    async fn list_media(&self, query: &PageQuery) -> ClientResult<Page<MediaAsset>> {
        self.get_public(&["media"], Some(query)).await
    }

    async fn create_suggestion(
        &self,
        request: &CreateSuggestionRequest,
    ) -> ClientResult<Suggestion> {
        validation::validate_suggestion(
            &request.title,
            &request.description,
            request.submitter_email.as_deref(),
        )?;
        let builder = self.http.post(self.endpoint(&["suggestions"])?).json(request);
        Ok(self.execute(builder, false).await?.json().await?)
    }
}

#[async_trait]
impl AdminApi for LayerTenClient {
    async fn create_list(&self, request: &CreateListRequest) -> ClientResult<RankedList> {
        let builder = self
            .admin_request(Method::POST, &["admin", "lists"])
            .await?
            .json(request);
        self.admin_json(builder).await
    }

    async fn update_list(
        &self,
        list_id: ListId,
        request: &UpdateListRequest,
    ) -> ClientResult<RankedList> {
        let id = list_id.0.to_string();
        let builder = self
            .admin_request(Method::PUT, &["admin", "lists", &id])
            .await?
            .json(request);
        self.admin_json(builder).await
    }

    async fn delete_list(&self, list_id: ListId) -> ClientResult<()> {
        let id = list_id.0.to_string();
        let builder = self
            .admin_request(Method::DELETE, &["admin", "lists", &id])
            .await?;
        self.admin_empty(builder).await
    }

    async fn add_entry(
        &self,
        list_id: ListId,
        request: &CreateEntryRequest,
    ) -> ClientResult<RankedEntry> {
        let id = list_id.0.to_string();
        let builder = self
            .admin_request(Method::POST, &["admin", "lists", &id, "entries"])
            .await?
            .json(request);
        self.admin_json(builder).await
    }

    async fn reorder_entries(
        &self,
        list_id: ListId,
        updates: &[EntryRankUpdate],
    ) -> ClientResult<()> {
        let id = list_id.0.to_string();
        let builder = self
            .admin_request(Method::PUT, &["admin", "lists", &id, "entries", "reorder"])
            .await?
            .json(updates);
        self.admin_empty(builder).await
    }

    async fn create_post(&self, request: &CreatePostRequest) -> ClientResult<BlogPostDetail> {
        let builder = self
            .admin_request(Method::POST, &["admin", "posts"])
            .await?
            .json(request);
        self.admin_json(builder).await
    }

    async fn update_post(
        &self,
        post_id: PostId,
        request: &UpdatePostRequest,
    ) -> ClientResult<BlogPostDetail> {
        let id = post_id.0.to_string();
        let builder = self
            .admin_request(Method::PUT, &["admin", "posts", &id])
            .await?
            .json(request);
        self.admin_json(builder).await
    }

    async fn delete_post(&self, post_id: PostId) -> ClientResult<()> {
        let id = post_id.0.to_string();
        let builder = self
            .admin_request(Method::DELETE, &["admin", "posts", &id])
            .await?;
        self.admin_empty(builder).await
    }

    async fn upload_media(&self, upload: MediaUpload) -> ClientResult<MediaAsset> {
        upload.validate()?;
        let MediaUpload {
            filename,
            content_type,
            bytes,
            alt_text,
        } = upload;
        let size_bytes = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(&content_type)?;
        let mut form = Form::new().part("file", part);
        if let Some(alt_text) = validation::non_blank(alt_text.as_deref()) {
            form = form.text("altText", alt_text);
        }
        debug!(%filename, size_bytes, "uploading media");
        let builder = self
            .admin_request(Method::POST, &["admin", "media"])
            .await?
            .multipart(form);
        self.admin_json(builder).await
    }

    async fn delete_media(&self, media_id: MediaId) -> ClientResult<()> {
        let id = media_id.0.to_string();
        let builder = self
            .admin_request(Method::DELETE, &["admin", "media", &id])
            .await?;
        self.admin_empty(builder).await
    }

    async fn list_suggestions(&self) -> ClientResult<Vec<Suggestion>> {
        let builder = self.admin_request(Method::GET, &LOGIN_PROBE_PATH).await?;
        self.admin_json(builder).await
    }

    async fn update_suggestion_status(
        &self,
        suggestion_id: SuggestionId,
        status: SuggestionStatus,
    ) -> ClientResult<Suggestion> {
        let id = suggestion_id.0.to_string();
        let builder = self
            .admin_request(Method::PUT, &["admin", "suggestions", &id])
            .await?
            .json(&UpdateSuggestionStatusRequest { status });
        self.admin_json(builder).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
