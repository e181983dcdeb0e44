use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    list_editor::{DeleteConfirmation, EditorError, EditorOptions},
    post_editor::PostEditor,
    suggestions::{StatusFilter, SuggestionQueue},
    validation::ValidationErrors,
    AdminApi, ClientError, EntryDraft, FileSessionStore, LayerTenClient, ListEditor, MediaUpload,
    PublicApi, MEDIA_LIBRARY_PAGE_SIZE,
};
use shared::{
    domain::{ListId, MediaId, PostId, PostStatus, SuggestionId, SuggestionStatus, TagId},
    protocol::{CreateSuggestionRequest, PageQuery},
};
use tracing_subscriber::EnvFilter;
use url::Url;

mod browse;
mod config;
mod render;

use browse::RevealView;
use config::Settings;

#[derive(Parser, Debug)]
#[command(name = "layerten", about = "Browse and manage layerten ranked lists")]
struct Cli {
    /// Backend base URL, e.g. `http://localhost:8080/api`.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    site_url: Option<String>,
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    /// Config file; defaults to `layerten.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

impl BrowseArgs {
    fn query(&self, size: u32) -> PageQuery {
        PageQuery {
            search: self.search.clone(),
            tag: self.tag.clone(),
            page: Some(self.page.saturating_sub(1)),
            size: Some(size),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse published lists.
    Lists(BrowseArgs),
    /// Read a list one entry at a time.
    Show {
        slug: String,
        /// Open at this rank with every entry shown.
        #[arg(long)]
        rank: Option<u32>,
        #[arg(long)]
        all: bool,
        /// Print the page once instead of reading commands from stdin.
        #[arg(long)]
        no_interactive: bool,
    },
    /// Browse blog posts.
    Posts(BrowseArgs),
    Post {
        slug: String,
    },
    /// Suggest a list idea to the editors.
    Suggest {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        examples: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Login {
        #[arg(long)]
        username: String,
        /// Falls back to `LAYERTEN_PASSWORD`.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Create a list, or load one by slug and change its details, entries and order.
    EditList(EditListArgs),
    DeleteList {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Create a post, or load one by slug and update it.
    SavePost(SavePostArgs),
    DeletePost {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Show the media library.
    Media,
    UploadMedia {
        path: PathBuf,
        #[arg(long)]
        alt: Option<String>,
    },
    DeleteMedia {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    Suggestions {
        /// `all`, `new`, `reviewing`, `accepted` or `declined`.
        #[arg(long, default_value = "all")]
        status: String,
    },
    SuggestionStatus {
        id: i64,
        status: String,
    },
}

/// Changes are applied in this order: removals, moves, additions.
#[derive(Args, Debug)]
struct EditListArgs {
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    subtitle: Option<String>,
    #[arg(long)]
    intro: Option<String>,
    #[arg(long)]
    outro: Option<String>,
    #[arg(long)]
    cover: Option<i64>,
    #[arg(long = "toggle-tag")]
    toggle_tags: Vec<i64>,
    /// Remove the entry at this 1-based position. Needs --yes.
    #[arg(long)]
    remove: Vec<usize>,
    /// Move an entry, e.g. `--move 3:1` puts the third entry first.
    #[arg(long = "move", value_parser = parse_move)]
    moves: Vec<(usize, usize)>,
    /// Append a new entry with this title.
    #[arg(long)]
    add: Vec<String>,
    #[arg(long)]
    yes: bool,
    /// Print the requests a save would send without sending them.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct SavePostArgs {
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    excerpt: Option<String>,
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,
    #[arg(long)]
    body_file: Option<PathBuf>,
    #[arg(long)]
    cover: Option<i64>,
    #[arg(long = "toggle-tag")]
    toggle_tags: Vec<i64>,
    /// Save as published instead of draft.
    #[arg(long)]
    publish: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(v) = cli.api_url {
        settings.api_base_url = v;
    }
    if let Some(v) = cli.site_url {
        settings.site_url = v;
    }
    if let Some(v) = cli.session_file {
        settings.session_path = v;
    }

    let store = Arc::new(FileSessionStore::new(settings.session_path.clone()));
    let client = LayerTenClient::new_with_session_store(&settings.api_base_url, store)
        .with_context(|| format!("invalid backend url '{}'", settings.api_base_url))?;

    let result = run(cli.command, &client, &settings).await;
    if let Err(err) = &result {
        if needs_login(err) {
            eprintln!("Sign in with `layerten login --username <name>` and try again.");
        }
    }
    result
}

fn needs_login(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::requires_reauth)
    })
}

async fn run(command: Command, client: &LayerTenClient, settings: &Settings) -> Result<()> {
    match command {
        Command::Lists(args) => {
            let page = client.list_lists(&args.query(settings.page_size)).await?;
            print!("{}", render::list_index(&page));
        }
        Command::Show {
            slug,
            rank,
            all,
            no_interactive,
        } => show_list(client, settings, &slug, rank, all, no_interactive).await?,
        Command::Posts(args) => {
            let page = client.list_posts(&args.query(settings.page_size)).await?;
            print!("{}", render::post_index(&page));
        }
        Command::Post { slug } => {
            let post = client
                .fetch_post(&slug)
                .await
                .with_context(|| format!("failed to load post '{slug}'"))?;
            print!("{}", render::post_detail(&post));
        }
        Command::Suggest {
            title,
            description,
            category,
            examples,
            name,
            email,
        } => {
            let request = CreateSuggestionRequest {
                title,
                description,
                category,
                example_entries: examples,
                submitter_name: name,
                submitter_email: email,
            };
            match client.create_suggestion(&request).await {
                Ok(suggestion) => println!("Thanks! Suggestion #{} received.", suggestion.id.0),
                Err(ClientError::Validation(errors)) => {
                    print_field_errors(&errors);
                    bail!("suggestion not sent");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => std::env::var("LAYERTEN_PASSWORD")
                    .context("pass --password or set LAYERTEN_PASSWORD")?,
            };
            client.login(&username, &password).await?;
            println!("Signed in as {username}.");
        }
        Command::Logout => {
            client.logout().await?;
            println!("Signed out.");
        }
        Command::Admin(command) => run_admin(command, client).await?,
    }
    Ok(())
}

async fn show_list(
    client: &LayerTenClient,
    settings: &Settings,
    slug: &str,
    rank: Option<u32>,
    all: bool,
    no_interactive: bool,
) -> Result<()> {
    let list = client
        .fetch_list(slug)
        .await
        .with_context(|| format!("failed to load list '{slug}'"))?;
    let site = Url::parse(&settings.site_url)
        .with_context(|| format!("invalid site url '{}'", settings.site_url))?;
    let page_url = browse::list_page_url(&site, &list.slug, rank)?;

    let mut view = RevealView::open(&list, page_url);
    if all && !view.controller().is_show_all() {
        view.toggle_show_all();
    }
    if no_interactive {
        print!("{}", view.render());
        return Ok(());
    }
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    view.run(stdin, &mut std::io::stdout()).await
}

async fn run_admin(command: AdminCommand, client: &LayerTenClient) -> Result<()> {
    match command {
        AdminCommand::EditList(args) => edit_list(client, args).await?,
        AdminCommand::DeleteList { id, yes } => {
            require_yes(yes, "list")?;
            client.delete_list(ListId(id)).await?;
            println!("Deleted list {id}.");
        }
        AdminCommand::SavePost(args) => save_post(client, args).await?,
        AdminCommand::DeletePost { id, yes } => {
            require_yes(yes, "post")?;
            client.delete_post(PostId(id)).await?;
            println!("Deleted post {id}.");
        }
        AdminCommand::Media => {
            let query = PageQuery {
                size: Some(MEDIA_LIBRARY_PAGE_SIZE),
                ..PageQuery::default()
            };
            let page = client.list_media(&query).await?;
            for asset in &page.content {
                println!(
                    "[{}] {} ({}, {} bytes) {}",
                    asset.id.0, asset.filename, asset.content_type, asset.file_size, asset.url
                );
            }
        }
        AdminCommand::UploadMedia { path, alt } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload")
                .to_string();
            let upload = MediaUpload {
                filename,
                content_type: content_type_for(&path).to_string(),
                bytes,
                alt_text: alt,
            };
            let asset = client.upload_media(upload).await?;
            println!("Uploaded media {} at {}", asset.id.0, asset.url);
        }
        AdminCommand::DeleteMedia { id, yes } => {
            require_yes(yes, "media")?;
            client.delete_media(MediaId(id)).await?;
            println!("Deleted media {id}.");
        }
        AdminCommand::Suggestions { status } => {
            let filter =
                StatusFilter::parse(&status).ok_or_else(|| anyhow!("unknown status '{status}'"))?;
            let mut queue = SuggestionQueue::load(client).await?;
            queue.filter = filter;
            print_counts(&queue);
            let mut shown = 0;
            for suggestion in queue.visible() {
                print!("{}", render::suggestion_row(suggestion));
                shown += 1;
            }
            if shown == 0 {
                println!("{}", queue.empty_message());
            }
        }
        AdminCommand::SuggestionStatus { id, status } => {
            let status = SuggestionStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown status '{status}'"))?;
            let mut queue = SuggestionQueue::load(client).await?;
            let updated = queue.set_status(client, SuggestionId(id), status).await?;
            print!("{}", render::suggestion_row(updated));
            print_counts(&queue);
        }
    }
    Ok(())
}

async fn edit_list(client: &LayerTenClient, args: EditListArgs) -> Result<()> {
    let options = EditorOptions::load(client).await;
    let mut editor = match &args.slug {
        Some(slug) => ListEditor::from_list(
            client
                .fetch_list(slug)
                .await
                .with_context(|| format!("failed to load list '{slug}'"))?,
        ),
        None => ListEditor::new(),
    }
    .with_options(options);

    if let Some(v) = args.title {
        editor.metadata.title = v;
    }
    if let Some(v) = args.subtitle {
        editor.metadata.subtitle = v;
    }
    if let Some(v) = args.intro {
        editor.metadata.intro = v;
    }
    if let Some(v) = args.outro {
        editor.metadata.outro = v;
    }
    if let Some(v) = args.cover {
        editor.metadata.cover_image_id = Some(MediaId(v));
    }
    for tag in args.toggle_tags {
        editor.toggle_tag(TagId(tag));
    }

    if !args.remove.is_empty() {
        require_yes(args.yes, "entries")?;
        let mut positions = args.remove;
        positions.sort_unstable();
        positions.dedup();
        for position in positions.into_iter().rev() {
            let index = position
                .checked_sub(1)
                .ok_or_else(|| anyhow!("entry positions start at 1"))?;
            editor.delete_entry(index, DeleteConfirmation::Confirmed)?;
        }
    }
    for (from, to) in args.moves {
        editor.drag_start(from)?;
        editor.drag_over(to)?;
        editor.drag_end();
    }
    for title in args.add {
        editor.add_entry(EntryDraft {
            title,
            ..EntryDraft::default()
        })?;
    }
    print!("{}", render::editor_entries(editor.entries()));

    if args.dry_run {
        let plan = editor.begin_save();
        editor.finish_save();
        match plan {
            Ok(plan) => print!("{}", render::save_plan(&plan)),
            Err(EditorError::Validation(errors)) => print_field_errors(&errors),
            Err(err) => return Err(err.into()),
        }
        return Ok(());
    }

    match editor.save(client).await {
        Ok(outcome) => {
            println!(
                "Saved list {} (/lists/{}): {} new entries, {} ranks sent.",
                outcome.list.id.0,
                outcome.list.slug,
                outcome.created_entries.len(),
                outcome.rank_updates.len()
            );
            Ok(())
        }
        Err(EditorError::Validation(errors)) => {
            print_field_errors(&errors);
            bail!("list not saved")
        }
        Err(err) => Err(err).context("list save did not complete; reload the list before retrying"),
    }
}

async fn save_post(client: &LayerTenClient, args: SavePostArgs) -> Result<()> {
    let mut editor = match &args.slug {
        Some(slug) => PostEditor::from_post(
            client
                .fetch_post(slug)
                .await
                .with_context(|| format!("failed to load post '{slug}'"))?,
        ),
        None => PostEditor::new(),
    };
    if let Some(v) = args.title {
        editor.title = v;
    }
    if let Some(v) = args.excerpt {
        editor.excerpt = v;
    }
    if let Some(v) = args.body {
        editor.body = v;
    }
    if let Some(path) = args.body_file {
        editor.body = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
    }
    if let Some(v) = args.cover {
        editor.cover_image_id = Some(MediaId(v));
    }
    for tag in args.toggle_tags {
        editor.toggle_tag(TagId(tag));
    }

    let status = if args.publish {
        PostStatus::Published
    } else {
        PostStatus::Draft
    };
    match editor.save(client, status).await {
        Ok(post) => {
            println!("Saved post {} ({:?}) at /posts/{}", post.id.0, post.status, post.slug);
            Ok(())
        }
        Err(ClientError::Validation(errors)) => {
            print_field_errors(&errors);
            bail!("post not saved")
        }
        Err(err) => Err(err.into()),
    }
}

fn print_counts(queue: &SuggestionQueue) {
    let counts: Vec<String> = SuggestionStatus::ALL
        .iter()
        .map(|status| format!("{} {}", status.as_str(), queue.count(*status)))
        .collect();
    println!("{}", counts.join("  "));
}

fn print_field_errors(errors: &ValidationErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {field}: {message}");
    }
}

fn require_yes(yes: bool, what: &str) -> Result<()> {
    if !yes {
        bail!("refusing to delete {what} without --yes");
    }
    Ok(())
}

/// `FROM:TO` with 1-based positions, returned as indexes.
fn parse_move(raw: &str) -> Result<(usize, usize), String> {
    let (from, to) = raw.split_once(':').ok_or("expected FROM:TO")?;
    let position = |value: &str| {
        value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|position| *position >= 1)
            .ok_or_else(|| format!("'{value}' is not a position (they start at 1)"))
    };
    Ok((position(from)? - 1, position(to)? - 1))
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn move_positions_become_indexes() {
        assert_eq!(parse_move("3:1"), Ok((2, 0)));
        assert!(parse_move("0:2").is_err());
        assert!(parse_move("3").is_err());
    }

    #[test]
    fn media_type_follows_extension() {
        assert_eq!(content_type_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("hero.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("notes.pdf")), "application/octet-stream");
    }

    #[test]
    fn expired_session_inside_save_error_asks_for_login() {
        let err = anyhow::Error::new(EditorError::Save {
            stage: client_core::list_editor::SaveStage::ReorderEntries,
            source: ClientError::SessionExpired,
        });
        assert!(needs_login(&err));
        assert!(!needs_login(&anyhow!("network down")));
    }

    #[test]
    fn edit_list_parses_repeated_operations() {
        let cli = Cli::try_parse_from([
            "layerten",
            "admin",
            "edit-list",
            "--slug",
            "best-bridges",
            "--move",
            "3:1",
            "--move",
            "1:2",
            "--add",
            "Øresund",
        ])
        .expect("parse");
        let Command::Admin(AdminCommand::EditList(args)) = cli.command else {
            panic!("expected edit-list");
        };
        assert_eq!(args.moves, vec![(2, 0), (0, 1)]);
        assert_eq!(args.add, vec!["Øresund".to_string()]);
    }
}
