//! Admin editor for one ranked list.
//!
//! The editor owns an in-memory copy of the list: metadata form fields, the ordered
//! entries (persisted ones plus entries created locally since load), and drag state.
//! Nothing reaches the backend until [`ListEditor::save`], which runs the reconciliation
//! in a fixed order: list metadata, then entry creations, then one bulk rank update.

use std::fmt;

use futures::join;
use shared::{
    domain::{
        EntryId, ListId, MediaAsset, MediaId, RankedEntry, RankedList, RankedListSummary, Tag,
        TagId,
    },
    protocol::{CreateEntryRequest, CreateListRequest, EntryRankUpdate, PageQuery},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    validation::{self, ValidationErrors},
    AdminApi, PublicApi, MEDIA_LIBRARY_PAGE_SIZE,
};

/// Lists page fetched to discover the tags an operator can pick from.
pub const TAG_SOURCE_PAGE_SIZE: u32 = 100;

/// Identity of an entry created in this editor and not yet saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRef {
    New(LocalHandle),
    Persisted(EntryId),
}

impl EntryRef {
    pub fn is_new(&self) -> bool {
        matches!(self, EntryRef::New(_))
    }

    pub fn persisted_id(&self) -> Option<EntryId> {
        match self {
            EntryRef::Persisted(id) => Some(*id),
            EntryRef::New(_) => None,
        }
    }
}

/// Entry form contents. `rank: None` means "next free slot" on add and "unchanged" on edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub rank: Option<u32>,
    pub title: String,
    pub blurb: Option<String>,
    pub commentary: Option<String>,
    pub fun_fact: Option<String>,
    pub external_link: Option<String>,
    pub hero_image_id: Option<MediaId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorEntry {
    pub entry_ref: EntryRef,
    pub rank: u32,
    pub title: String,
    pub blurb: Option<String>,
    pub commentary: Option<String>,
    pub fun_fact: Option<String>,
    pub external_link: Option<String>,
    pub hero_image_id: Option<MediaId>,
    pub hero_image: Option<MediaAsset>,
    edited: bool,
}

impl EditorEntry {
    fn from_persisted(entry: RankedEntry) -> Self {
        Self {
            entry_ref: EntryRef::Persisted(entry.id),
            rank: entry.rank,
            title: entry.title,
            blurb: entry.blurb,
            commentary: entry.commentary,
            fun_fact: entry.fun_fact,
            external_link: entry.external_link,
            hero_image_id: entry.hero_image.as_ref().map(|asset| asset.id),
            hero_image: entry.hero_image,
            edited: false,
        }
    }

    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            rank: Some(self.rank),
            title: self.title.clone(),
            blurb: self.blurb.clone(),
            commentary: self.commentary.clone(),
            fun_fact: self.fun_fact.clone(),
            external_link: self.external_link.clone(),
            hero_image_id: self.hero_image_id,
        }
    }

    fn to_create_request(&self) -> CreateEntryRequest {
        CreateEntryRequest {
            rank: self.rank,
            title: self.title.trim().to_string(),
            blurb: validation::non_blank(self.blurb.as_deref()),
            commentary: validation::non_blank(self.commentary.as_deref()),
            fun_fact: validation::non_blank(self.fun_fact.as_deref()),
            external_link: validation::non_blank(self.external_link.as_deref()),
            hero_image_id: self.hero_image_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMetadata {
    pub title: String,
    pub subtitle: String,
    pub intro: String,
    pub outro: String,
    pub cover_image_id: Option<MediaId>,
    pub tag_ids: Vec<TagId>,
}

impl ListMetadata {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validation::validate_list(&self.title, &self.intro)
    }

    fn to_request(&self) -> CreateListRequest {
        CreateListRequest {
            title: self.title.trim().to_string(),
            subtitle: validation::non_blank(Some(self.subtitle.as_str())),
            intro: self.intro.clone(),
            outro: validation::non_blank(Some(self.outro.as_str())),
            cover_image_id: self.cover_image_id,
            tag_ids: self.tag_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteConfirmation {
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStage {
    ListMetadata,
    CreateEntry { title: String },
    ReorderEntries,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStage::ListMetadata => f.write_str("saving list details"),
            SaveStage::CreateEntry { title } => write!(f, "creating entry '{title}'"),
            SaveStage::ReorderEntries => f.write_str("updating entry ranks"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("entry index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{stage} failed: {source}")]
    Save {
        stage: SaveStage,
        #[source]
        source: ClientError,
    },
}

/// Snapshot of everything a save will send, computed before any request goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    pub list_id: Option<ListId>,
    pub metadata: CreateListRequest,
    pub new_entries: Vec<CreateEntryRequest>,
    pub rank_updates: Vec<EntryRankUpdate>,
    /// Persisted entries whose fields were edited locally. There is no endpoint to
    /// update an entry's content, so these edits are not sent.
    pub unsynced_edits: Vec<EntryId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub list: RankedList,
    pub created_entries: Vec<RankedEntry>,
    pub rank_updates: Vec<EntryRankUpdate>,
    pub unsynced_edits: Vec<EntryId>,
}

impl SavePlan {
    pub async fn execute(self, api: &dyn AdminApi) -> Result<SaveOutcome, EditorError> {
        let list = match self.list_id {
            Some(list_id) => api.update_list(list_id, &self.metadata.clone().into()).await,
            None => api.create_list(&self.metadata).await,
        }
        .map_err(|source| EditorError::Save {
            stage: SaveStage::ListMetadata,
            source,
        })?;
        info!(list_id = list.id.0, slug = %list.slug, "list details saved");

        let mut created_entries = Vec::with_capacity(self.new_entries.len());
        for request in &self.new_entries {
            let created = api
                .add_entry(list.id, request)
                .await
                .map_err(|source| EditorError::Save {
                    stage: SaveStage::CreateEntry {
                        title: request.title.clone(),
                    },
                    source,
                })?;
            debug!(entry_id = created.id.0, rank = created.rank, "entry created");
            created_entries.push(created);
        }

        if !self.rank_updates.is_empty() {
            api.reorder_entries(list.id, &self.rank_updates)
                .await
                .map_err(|source| EditorError::Save {
                    stage: SaveStage::ReorderEntries,
                    source,
                })?;
            debug!(count = self.rank_updates.len(), "entry ranks updated");
        }

        if !self.unsynced_edits.is_empty() {
            warn!(
                count = self.unsynced_edits.len(),
                "edits to existing entries were not sent; the backend cannot update entry content"
            );
        }

        Ok(SaveOutcome {
            list,
            created_entries,
            rank_updates: self.rank_updates,
            unsynced_edits: self.unsynced_edits,
        })
    }
}

/// Tags and media the editor offers for selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorOptions {
    pub tags: Vec<Tag>,
    pub media: Vec<MediaAsset>,
}

impl EditorOptions {
    /// Loads both option sets concurrently. Either fetch failing leaves that set empty.
    pub async fn load(api: &dyn PublicApi) -> Self {
        let tag_query = PageQuery {
            size: Some(TAG_SOURCE_PAGE_SIZE),
            ..PageQuery::default()
        };
        let media_query = PageQuery {
            size: Some(MEDIA_LIBRARY_PAGE_SIZE),
            ..PageQuery::default()
        };
        let (lists, media) = join!(api.list_lists(&tag_query), api.list_media(&media_query));

        let tags = match lists {
            Ok(page) => collect_tags(&page.content),
            Err(err) => {
                warn!(error = %err, "failed to load tags");
                Vec::new()
            }
        };
        let media = match media {
            Ok(page) => page.content,
            Err(err) => {
                warn!(error = %err, "failed to load media library");
                Vec::new()
            }
        };
        Self { tags, media }
    }
}

/// Distinct tags across the given lists, in first-seen order.
pub fn collect_tags(lists: &[RankedListSummary]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for tag in lists.iter().flat_map(|list| list.tags.iter()) {
        if !tags.iter().any(|known| known.id == tag.id) {
            tags.push(tag.clone());
        }
    }
    tags
}

#[derive(Debug, Clone, Default)]
pub struct ListEditor {
    list_id: Option<ListId>,
    pub metadata: ListMetadata,
    entries: Vec<EditorEntry>,
    options: EditorOptions,
    dragged: Option<usize>,
    next_handle: u64,
    saving: bool,
    errors: ValidationErrors,
}

impl ListEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor for an existing list. Entries are ordered by rank.
    pub fn from_list(list: RankedList) -> Self {
        let mut entries: Vec<EditorEntry> = list
            .entries
            .into_iter()
            .map(EditorEntry::from_persisted)
            .collect();
        entries.sort_by_key(|entry| entry.rank);

        Self {
            list_id: Some(list.id),
            metadata: ListMetadata {
                title: list.title,
                subtitle: list.subtitle.unwrap_or_default(),
                intro: list.intro,
                outro: list.outro.unwrap_or_default(),
                cover_image_id: list.cover_image.map(|asset| asset.id),
                tag_ids: list.tags.iter().map(|tag| tag.id).collect(),
            },
            entries,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: EditorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn list_id(&self) -> Option<ListId> {
        self.list_id
    }

    pub fn entries(&self) -> &[EditorEntry] {
        &self.entries
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn dragged_index(&self) -> Option<usize> {
        self.dragged
    }

    /// Rank pre-filled in the "add entry" form.
    pub fn suggested_rank(&self) -> u32 {
        self.entries.len() as u32 + 1
    }

    pub fn toggle_tag(&mut self, tag_id: TagId) {
        if let Some(pos) = self.metadata.tag_ids.iter().position(|id| *id == tag_id) {
            self.metadata.tag_ids.remove(pos);
        } else {
            self.metadata.tag_ids.push(tag_id);
        }
    }

    pub fn add_entry(&mut self, draft: EntryDraft) -> Result<EntryRef, EditorError> {
        let rank = draft.rank.unwrap_or_else(|| self.suggested_rank());
        validation::validate_entry(rank, &draft.title)?;

        self.next_handle += 1;
        let entry_ref = EntryRef::New(LocalHandle(self.next_handle));
        let hero_image = self.resolve_hero(None, draft.hero_image_id);
        self.entries.push(EditorEntry {
            entry_ref,
            rank,
            title: draft.title,
            blurb: draft.blurb,
            commentary: draft.commentary,
            fun_fact: draft.fun_fact,
            external_link: draft.external_link,
            hero_image_id: draft.hero_image_id,
            hero_image,
            edited: false,
        });
        Ok(entry_ref)
    }

    /// Replaces the entry's fields in place. Identity is kept, and so is an already
    /// resolved hero image when the draft still points at it.
    pub fn edit_entry(&mut self, index: usize, draft: EntryDraft) -> Result<(), EditorError> {
        self.check_index(index)?;
        let rank = draft.rank.unwrap_or(self.entries[index].rank);
        validation::validate_entry(rank, &draft.title)?;

        let current_hero = self.entries[index].hero_image.as_ref();
        let hero_image = self.resolve_hero(current_hero, draft.hero_image_id);
        let entry = &mut self.entries[index];
        entry.rank = rank;
        entry.title = draft.title;
        entry.blurb = draft.blurb;
        entry.commentary = draft.commentary;
        entry.fun_fact = draft.fun_fact;
        entry.external_link = draft.external_link;
        entry.hero_image_id = draft.hero_image_id;
        entry.hero_image = hero_image;
        entry.edited = !entry.entry_ref.is_new();
        Ok(())
    }

    pub fn delete_entry(
        &mut self,
        index: usize,
        confirmation: DeleteConfirmation,
    ) -> Result<Option<EditorEntry>, EditorError> {
        self.check_index(index)?;
        if confirmation == DeleteConfirmation::Declined {
            return Ok(None);
        }
        self.dragged = None;
        Ok(Some(self.entries.remove(index)))
    }

    /// Moves one entry with a single splice: entries between the two positions shift
    /// by one slot.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let entry = self.entries.remove(from);
            self.entries.insert(to, entry);
        }
        Ok(())
    }

    pub fn drag_start(&mut self, index: usize) -> Result<(), EditorError> {
        self.check_index(index)?;
        self.dragged = Some(index);
        Ok(())
    }

    /// Pointer moved over `index` during a drag. Returns whether the order changed.
    pub fn drag_over(&mut self, index: usize) -> Result<bool, EditorError> {
        let Some(dragged) = self.dragged else {
            return Ok(false);
        };
        if dragged == index {
            return Ok(false);
        }
        self.move_entry(dragged, index)?;
        self.dragged = Some(index);
        Ok(true)
    }

    pub fn drag_end(&mut self) {
        self.dragged = None;
    }

    /// Validates and snapshots the save. Marks the editor busy until
    /// [`ListEditor::finish_save`].
    pub fn begin_save(&mut self) -> Result<SavePlan, EditorError> {
        if self.saving {
            return Err(EditorError::SaveInFlight);
        }
        if let Err(errors) = self.metadata.validate() {
            self.errors = errors.clone();
            return Err(errors.into());
        }
        self.errors = ValidationErrors::new();

        let plan = self.plan();
        self.saving = true;
        Ok(plan)
    }

    pub fn finish_save(&mut self) {
        self.saving = false;
    }

    /// The busy flag is cleared even when the returned future is dropped before it
    /// completes.
    pub async fn save(&mut self, api: &dyn AdminApi) -> Result<SaveOutcome, EditorError> {
        let plan = self.begin_save()?;
        let _busy = SavingGuard(&mut self.saving);
        plan.execute(api).await
    }

    fn plan(&self) -> SavePlan {
        let new_entries = self
            .entries
            .iter()
            .filter(|entry| entry.entry_ref.is_new())
            .map(EditorEntry::to_create_request)
            .collect();

        // Persisted entries are renumbered among themselves; new entries keep the rank
        // they were created with and do not take a slot here.
        let rank_updates = self
            .entries
            .iter()
            .filter_map(|entry| entry.entry_ref.persisted_id())
            .enumerate()
            .map(|(position, entry_id)| EntryRankUpdate {
                entry_id,
                new_rank: position as u32 + 1,
            })
            .collect();

        let unsynced_edits = self
            .entries
            .iter()
            .filter(|entry| entry.edited)
            .filter_map(|entry| entry.entry_ref.persisted_id())
            .collect();

        SavePlan {
            list_id: self.list_id,
            metadata: self.metadata.to_request(),
            new_entries,
            rank_updates,
            unsynced_edits,
        }
    }

    fn resolve_hero(
        &self,
        current: Option<&MediaAsset>,
        id: Option<MediaId>,
    ) -> Option<MediaAsset> {
        let id = id?;
        if let Some(current) = current.filter(|asset| asset.id == id) {
            return Some(current.clone());
        }
        self.options.media.iter().find(|asset| asset.id == id).cloned()
    }

    fn check_index(&self, index: usize) -> Result<(), EditorError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(EditorError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }
}

struct SavingGuard<'a>(&'a mut bool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
#[path = "tests/list_editor_tests.rs"]
mod tests;
