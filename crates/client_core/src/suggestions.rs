use shared::domain::{Suggestion, SuggestionId, SuggestionStatus};
use tracing::info;

use crate::{AdminApi, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(SuggestionStatus),
}

impl StatusFilter {
    pub fn matches(self, status: SuggestionStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }

    /// Accepts `all` or a status name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Some(StatusFilter::All);
        }
        SuggestionStatus::parse(raw).map(StatusFilter::Only)
    }
}

/// Moderation queue for reader suggestions.
#[derive(Debug, Clone, Default)]
pub struct SuggestionQueue {
    suggestions: Vec<Suggestion>,
    pub filter: StatusFilter,
}

impl SuggestionQueue {
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        Self {
            suggestions,
            filter: StatusFilter::All,
        }
    }

    pub async fn load(api: &dyn AdminApi) -> ClientResult<Self> {
        Ok(Self::new(api.list_suggestions().await?))
    }

    pub fn all(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn visible(&self) -> impl Iterator<Item = &Suggestion> {
        let filter = self.filter;
        self.suggestions
            .iter()
            .filter(move |suggestion| filter.matches(suggestion.status))
    }

    pub fn count(&self, status: SuggestionStatus) -> usize {
        self.suggestions
            .iter()
            .filter(|suggestion| suggestion.status == status)
            .count()
    }

    pub fn empty_message(&self) -> String {
        match self.filter {
            StatusFilter::All => "No suggestions yet".to_string(),
            StatusFilter::Only(status) => {
                format!("No {} suggestions", status.as_str().to_lowercase())
            }
        }
    }

    /// Sends the status change and replaces the local copy with the backend's answer.
    /// On failure the queue is left untouched.
    pub async fn set_status(
        &mut self,
        api: &dyn AdminApi,
        id: SuggestionId,
        status: SuggestionStatus,
    ) -> ClientResult<&Suggestion> {
        let updated = api.update_suggestion_status(id, status).await?;
        info!(suggestion_id = id.0, status = status.as_str(), "suggestion status updated");
        let index = match self.suggestions.iter().position(|s| s.id == id) {
            Some(index) => {
                self.suggestions[index] = updated;
                index
            }
            None => {
                self.suggestions.push(updated);
                self.suggestions.len() - 1
            }
        };
        Ok(&self.suggestions[index])
    }
}
