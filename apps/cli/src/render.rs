use std::fmt::Write as _;

use client_core::{
    list_editor::{EditorEntry, SavePlan},
    pagination::{PageSlot, Pager},
};
use shared::{
    domain::{BlogPostDetail, BlogPostSummary, RankedEntry, RankedListSummary, Suggestion, Tag},
    protocol::Page,
};

fn tag_names(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag.slug))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn list_index(page: &Page<RankedListSummary>) -> String {
    let mut out = String::new();
    if page.content.is_empty() {
        out.push_str("No lists found.\n");
    }
    for list in &page.content {
        let _ = writeln!(
            out,
            "[{}] {} ({} entries)  /lists/{}",
            list.id.0, list.title, list.entry_count, list.slug
        );
        if let Some(subtitle) = &list.subtitle {
            let _ = writeln!(out, "      {subtitle}");
        }
        if !list.tags.is_empty() {
            let _ = writeln!(out, "      {}", tag_names(&list.tags));
        }
    }
    out.push_str(&pager(&Pager::from_page(page)));
    out
}

pub fn post_index(page: &Page<BlogPostSummary>) -> String {
    let mut out = String::new();
    if page.content.is_empty() {
        out.push_str("No posts found.\n");
    }
    for post in &page.content {
        let date = post
            .published_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "draft".to_string());
        let _ = writeln!(out, "[{}] {} ({date})  /posts/{}", post.id.0, post.title, post.slug);
        let _ = writeln!(out, "      {}", post.excerpt);
    }
    out.push_str(&pager(&Pager::from_page(page)));
    out
}

pub fn post_detail(post: &BlogPostDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", post.title);
    if let Some(at) = post.published_at {
        let _ = writeln!(out, "{}", at.format("%B %-d, %Y"));
    }
    if !post.tags.is_empty() {
        let _ = writeln!(out, "{}", tag_names(&post.tags));
    }
    let _ = writeln!(out, "\n{}\n", post.body.trim_end());
    out
}

pub fn pager(pager: &Pager) -> String {
    if !pager.is_visible() {
        return String::new();
    }
    let slots: Vec<String> = pager
        .slots()
        .into_iter()
        .map(|slot| match slot {
            PageSlot::Page(index) if index == pager.current => format!("[{}]", index + 1),
            PageSlot::Page(index) => (index + 1).to_string(),
            PageSlot::Ellipsis => "...".to_string(),
        })
        .collect();
    format!("{}\npages: {}\n", pager.summary(), slots.join(" "))
}

pub fn entry_card(entry: &RankedEntry, highlighted: bool) -> String {
    let mut out = String::new();
    let marker = if highlighted { ">" } else { " " };
    let _ = writeln!(out, "{marker} #{} {}", entry.rank, entry.title);
    for (label, value) in [
        ("", &entry.blurb),
        ("", &entry.commentary),
        ("Fun fact: ", &entry.fun_fact),
        ("Link: ", &entry.external_link),
    ] {
        if let Some(value) = value {
            let _ = writeln!(out, "    {label}{value}");
        }
    }
    if let Some(hero) = &entry.hero_image {
        let alt = hero.alt_text.as_deref().unwrap_or(&hero.filename);
        let _ = writeln!(out, "    [image: {alt}] {}", hero.url);
    }
    out
}

pub fn editor_entries(entries: &[EditorEntry]) -> String {
    let mut out = String::new();
    for (position, entry) in entries.iter().enumerate() {
        let state = if entry.entry_ref.is_new() { " (new)" } else { "" };
        let _ = writeln!(
            out,
            "{:>3}. rank {} {}{state}",
            position + 1,
            entry.rank,
            entry.title
        );
    }
    out
}

pub fn save_plan(plan: &SavePlan) -> String {
    let mut out = String::new();
    match plan.list_id {
        Some(id) => {
            let _ = writeln!(out, "update list {}: {}", id.0, plan.metadata.title);
        }
        None => {
            let _ = writeln!(out, "create list: {}", plan.metadata.title);
        }
    }
    for entry in &plan.new_entries {
        let _ = writeln!(out, "create entry rank {}: {}", entry.rank, entry.title);
    }
    if !plan.rank_updates.is_empty() {
        let pairs: Vec<String> = plan
            .rank_updates
            .iter()
            .map(|update| format!("{}->{}", update.entry_id.0, update.new_rank))
            .collect();
        let _ = writeln!(out, "set ranks: {}", pairs.join(", "));
    }
    out
}

pub fn suggestion_row(suggestion: &Suggestion) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] {:<9} {}  ({})",
        suggestion.id.0,
        suggestion.status.as_str(),
        suggestion.title,
        suggestion.created_at.format("%Y-%m-%d")
    );
    let _ = writeln!(out, "      {}", suggestion.description);
    if let Some(examples) = &suggestion.example_entries {
        let _ = writeln!(out, "      examples: {examples}");
    }
    if let Some(name) = &suggestion.submitter_name {
        let email = suggestion.submitter_email.as_deref().unwrap_or("-");
        let _ = writeln!(out, "      from {name} <{email}>");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::EntryId;

    #[test]
    fn pager_marks_current_page_and_hides_single_page() {
        let many = Pager {
            current: 4,
            total_pages: 10,
            total_elements: 120,
            page_size: 12,
        };
        assert_eq!(
            pager(&many),
            "Showing 49 to 60 of 120 results\npages: 1 ... 4 [5] 6 ... 10\n"
        );

        let single = Pager {
            total_pages: 1,
            ..many
        };
        assert!(pager(&single).is_empty());
    }

    #[test]
    fn entry_card_lists_optional_fields() {
        let entry = RankedEntry {
            id: EntryId(1),
            rank: 3,
            title: "Millau Viaduct".to_string(),
            blurb: Some("Tallest bridge".to_string()),
            commentary: None,
            fun_fact: Some("Opened in 2004".to_string()),
            external_link: None,
            hero_image: None,
        };
        assert_eq!(
            entry_card(&entry, true),
            "> #3 Millau Viaduct\n    Tallest bridge\n    Fun fact: Opened in 2004\n"
        );
    }
}
