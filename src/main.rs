//! trailbook - travel journal content tool with a cascade deletion workflow.
//!
//! Usage:
//!   trailbook tree <FILE>             Show the journal content tree
//!   trailbook stats <FILE>            Snapshot statistics
//!   trailbook refs <FILE> ...         Find usages of photos across the journal
//!   trailbook delete <FILE> ...       Run a deletion through the workflow
//!   trailbook message-photo <FILE>    Delete a photo attached to a chat message
//!   trailbook --help                  Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Context, ContextCompat, Result};
use indexmap::IndexSet;

use trailbook_core::{
    ContentNode, GraphStats, JournalGraph, Location, MomentId, Photo, PhotoId, RefPath, SessionId,
};
use trailbook_flow::{
    delete_message_photo_with_file, remove_message_photo, CommitOutcome, ConfirmOutcome,
    DeletionWorkflow, JournalStore, MessageDeleteOutcome, RecordingNavigator, ScopeField,
    StoreError, WorkflowConfig, WorkflowStage,
};
use trailbook_index::{find_references, CrossReference, ReferenceQuery};

#[derive(Parser)]
#[command(
    name = "trailbook",
    version,
    about = "Travel-journal content tool with safe cascade deletion",
    long_about = "trailbook operates on a JSON snapshot of a travel journal.\n\n\
                  Deletions run through a guarded workflow: cloud files are only \
                  deleted after a cross-reference check proves no other moment or \
                  chat session still uses them."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the journal content tree
    Tree {
        /// Journal snapshot (JSON)
        file: PathBuf,
    },

    /// Snapshot statistics
    Stats {
        /// Journal snapshot (JSON)
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find usages of photos outside one location
    Refs {
        /// Journal snapshot (JSON)
        file: PathBuf,

        /// Photo id to look for (repeatable)
        #[arg(long = "photo", required = true)]
        photos: Vec<String>,

        /// Location to exclude, e.g. "moment:m1" or "session:s1"
        #[arg(long)]
        from: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a moment, post, or photo reference through the workflow
    Delete {
        /// Journal snapshot (JSON); rewritten in place on commit
        file: PathBuf,

        /// Moment to delete
        #[arg(long, conflicts_with_all = ["post", "photo"])]
        moment: Option<String>,

        /// Post to delete (looked up across moments)
        #[arg(long, conflicts_with = "photo")]
        post: Option<String>,

        /// Single photo reference to remove
        #[arg(long, requires = "from")]
        photo: Option<String>,

        /// Location of the photo reference, e.g. "moment:m1"
        #[arg(long)]
        from: Option<String>,

        /// Keep the target's posts
        #[arg(long)]
        keep_posts: bool,

        /// Keep the target's photos
        #[arg(long)]
        keep_photos: bool,

        /// Also delete the detached photos' cloud files
        #[arg(long)]
        cloud: bool,

        /// When blocked by outside usages, fall back to local-only removal
        #[arg(long)]
        local_fallback: bool,
    },

    /// Delete a photo attached to a chat message
    MessagePhoto {
        /// Journal snapshot (JSON); rewritten in place
        file: PathBuf,

        /// Session holding the message
        #[arg(long)]
        session: String,

        /// Message holding the photo
        #[arg(long)]
        message: String,

        /// Photo id to remove
        #[arg(long)]
        photo: String,

        /// Also delete the physical file (runs the usage check first)
        #[arg(long)]
        delete_file: bool,

        /// Skip the usage check before deleting the file
        #[arg(long, requires = "delete_file")]
        legacy: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Tree { file } => run_tree(&file),
        Command::Stats { file, format } => run_stats(&file, format),
        Command::Refs {
            file,
            photos,
            from,
            format,
        } => run_refs(&file, &photos, &from, format),
        Command::Delete {
            file,
            moment,
            post,
            photo,
            from,
            keep_posts,
            keep_photos,
            cloud,
            local_fallback,
        } => run_delete(
            &file,
            moment.as_deref(),
            post.as_deref(),
            photo.as_deref(),
            from.as_deref(),
            keep_posts,
            keep_photos,
            cloud,
            local_fallback,
        ),
        Command::MessagePhoto {
            file,
            session,
            message,
            photo,
            delete_file,
            legacy,
        } => run_message_photo(&file, &session, &message, &photo, delete_file, legacy),
    }
}

/// Store over a JSON snapshot file, rewritten after every mutation.
///
/// Cloud deletion is reported, not performed: wiring a real remote store
/// in means implementing [`JournalStore`] against its API.
struct FileStore {
    path: PathBuf,
    graph: JournalGraph,
}

impl FileStore {
    fn open(path: &Path) -> Result<Self> {
        let graph = load_graph(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            graph,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.graph).map_err(|e| StoreError::Backend {
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::Backend {
            message: e.to_string(),
        })
    }
}

impl JournalStore for FileStore {
    fn load_snapshot(&mut self) -> Result<JournalGraph, StoreError> {
        Ok(self.graph.clone())
    }

    fn remove_local_reference(&mut self, path: &RefPath) -> Result<(), StoreError> {
        self.graph.remove_reference(path)?;
        self.persist()
    }

    fn delete_cloud_file(&mut self, photo: &PhotoId) -> Result<(), StoreError> {
        eprintln!("cloud: deleted file for photo '{photo}'");
        Ok(())
    }
}

fn load_graph(path: &Path) -> Result<JournalGraph> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid snapshot in {}", path.display()))
}

/// Parse "moment:m1" or "session:s1".
fn parse_location(s: &str) -> Result<Location> {
    match s.split_once(':') {
        Some(("moment", id)) => Ok(Location::moment(&MomentId::new(id))),
        Some(("session", id)) => Ok(Location::session(&SessionId::new(id))),
        _ => bail!("Expected 'moment:<id>' or 'session:<id>', got '{s}'"),
    }
}

/// Show the journal content tree.
fn run_tree(file: &Path) -> Result<()> {
    let graph = load_graph(file)?;

    for moment in &graph.moments {
        println!(
            "▼ {} {} ({} posts, {} photos)",
            moment.date,
            moment.title,
            moment.post_count(),
            moment.photo_count()
        );
        for photo in &moment.photos {
            println!("    {} ({})", photo.id, photo.file);
        }
        for post in &moment.posts {
            println!("  ▪ {} [{}]", post.title, post.id);
            for photo in &post.photos {
                println!("      {} ({})", photo.id, photo.file);
            }
        }
    }

    for session in &graph.sessions {
        println!(
            "▼ {} {} ({} messages)",
            session.started_at.format("%Y-%m-%d"),
            session.title,
            session.messages.len()
        );
        for message in &session.messages {
            for photo in &message.photos {
                println!("    {} (in message {})", photo.id, message.id);
            }
        }
    }

    Ok(())
}

/// Print snapshot statistics.
fn run_stats(file: &Path, format: OutputFormat) -> Result<()> {
    let graph = load_graph(file)?;
    let stats = GraphStats::for_graph(&graph);

    match format {
        OutputFormat::Text => {
            println!("{}", "─".repeat(40));
            println!(" moments:    {}", stats.moment_count);
            println!(" posts:      {}", stats.post_count);
            println!(" photo refs: {}", stats.photo_ref_count);
            println!(" sessions:   {}", stats.session_count);
            println!(" messages:   {}", stats.message_count);
            println!("{}", "─".repeat(40));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Run a cross-reference query.
fn run_refs(file: &Path, photos: &[String], from: &str, format: OutputFormat) -> Result<()> {
    let graph = load_graph(file)?;
    let excluding = parse_location(from)?;

    let photo_ids: IndexSet<PhotoId> = photos.iter().map(|p| PhotoId::new(p.as_str())).collect();
    let query = ReferenceQuery::new(photo_ids, excluding);
    let refs = find_references(&graph, &query);

    match format {
        OutputFormat::Text => {
            if refs.is_empty() {
                println!("No usages outside {from}.");
            } else {
                print_references(&refs);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&refs)?);
        }
    }

    Ok(())
}

fn print_references(refs: &[CrossReference]) {
    for (i, reference) in refs.iter().enumerate() {
        let mut detail = reference.anchor.title.to_string();
        if let Some(item) = &reference.anchor.item {
            detail.push_str(&format!(", in {item}"));
        }
        if let Some(ts) = &reference.anchor.timestamp {
            detail.push_str(&format!(", {}", ts.format("%Y-%m-%d %H:%M")));
        }
        println!(
            " {:>3}. {} — {} ({detail})",
            i + 1,
            reference.photo,
            reference.location
        );
    }
}

/// Run a deletion through the workflow, non-interactively.
#[allow(clippy::too_many_arguments)]
fn run_delete(
    file: &Path,
    moment: Option<&str>,
    post: Option<&str>,
    photo: Option<&str>,
    from: Option<&str>,
    keep_posts: bool,
    keep_photos: bool,
    cloud: bool,
    local_fallback: bool,
) -> Result<()> {
    let store = FileStore::open(file)?;
    let (target, origin) = resolve_target(&store.graph, moment, post, photo, from)?;

    let mut flow = DeletionWorkflow::new(store, RecordingNavigator::default());
    flow.begin(target, origin)?;

    if flow.stage() == WorkflowStage::ScopeSelection {
        if keep_posts {
            flow.toggle_scope(ScopeField::ChildPosts, false)?;
        }
        if keep_photos {
            flow.toggle_scope(ScopeField::ChildPhotos, false)?;
        }
        if cloud {
            flow.toggle_scope(ScopeField::CloudFiles, true)?;
        }
        flow.accept_scope()?;
    } else if cloud {
        // Nothing to detach: the target has no photos.
        eprintln!("Note: --cloud ignored, the target has no photos.");
    }

    let outcome = match flow.confirm_cloud()? {
        ConfirmOutcome::Committed(outcome) => outcome,
        ConfirmOutcome::ReadyToCommit => flow.commit()?,
        ConfirmOutcome::Blocked => {
            println!("{}", "─".repeat(60));
            println!(" Blocked: the photos are still used elsewhere");
            println!("{}", "─".repeat(60));
            print_references(flow.blocking_refs());
            println!();

            if !local_fallback {
                println!("Nothing was deleted. Remove the usages above and retry,");
                println!("or pass --local-fallback to remove references only.");
                flow.cancel()?;
                return Ok(());
            }
            println!("Falling back to local-only removal (files kept).");
            flow.confirm_local()?
        }
    };

    match outcome {
        CommitOutcome::Committed {
            removed,
            cloud_deleted,
        } => {
            println!(
                "Deleted: {} reference(s) removed, {} cloud file(s) deleted.",
                removed.len(),
                cloud_deleted.len()
            );
        }
        CommitOutcome::Partial {
            cloud_deleted,
            failures,
        } => {
            println!(
                "Partial: {} cloud file(s) deleted, {} failed:",
                cloud_deleted.len(),
                failures.len()
            );
            for failure in &failures {
                println!("  {} ({}): {}", failure.photo, failure.file, failure.message);
            }
            println!("References for the failed files were kept. Re-run to retry.");
        }
    }

    Ok(())
}

/// Resolve the deletion target and its origin location from the flags.
fn resolve_target(
    graph: &JournalGraph,
    moment: Option<&str>,
    post: Option<&str>,
    photo: Option<&str>,
    from: Option<&str>,
) -> Result<(ContentNode, Location)> {
    if let Some(id) = moment {
        let moment_id = MomentId::new(id);
        let moment = graph
            .find_moment(&moment_id)
            .with_context(|| format!("No moment '{id}'"))?;
        return Ok((ContentNode::Moment(moment.clone()), Location::moment(&moment_id)));
    }
    if let Some(id) = post {
        let (moment, post) = graph
            .find_post(&id.into())
            .with_context(|| format!("No post '{id}'"))?;
        return Ok((ContentNode::Post(post.clone()), Location::moment(&moment.id)));
    }
    if let (Some(id), Some(from)) = (photo, from) {
        let origin = parse_location(from)?;
        let photo_id = PhotoId::new(id);
        let entry = find_photo_entry(graph, &origin, &photo_id)
            .with_context(|| format!("No photo '{id}' in {from}"))?;
        return Ok((ContentNode::Photo(entry), origin));
    }
    bail!("Pass one of --moment, --post, or --photo with --from");
}

/// Find a photo entry within one location.
fn find_photo_entry(graph: &JournalGraph, origin: &Location, photo: &PhotoId) -> Option<Photo> {
    match origin.kind {
        trailbook_core::LocationKind::Moment => {
            let moment = graph.find_moment(&MomentId::new(origin.id.clone()))?;
            moment
                .photos
                .iter()
                .chain(moment.posts.iter().flat_map(|p| p.photos.iter()))
                .find(|p| &p.id == photo)
                .cloned()
        }
        trailbook_core::LocationKind::Session => {
            let session = graph.find_session(&SessionId::new(origin.id.clone()))?;
            session
                .messages
                .iter()
                .flat_map(|m| m.photos.iter())
                .find(|p| &p.id == photo)
                .cloned()
        }
    }
}

/// Delete a photo attached to a chat message.
fn run_message_photo(
    file: &Path,
    session: &str,
    message: &str,
    photo: &str,
    delete_file: bool,
    legacy: bool,
) -> Result<()> {
    let mut store = FileStore::open(file)?;
    let session_id = SessionId::new(session);
    let message_id = message.into();
    let photo_id = PhotoId::new(photo);

    if !delete_file {
        remove_message_photo(&mut store, &session_id, &message_id, &photo_id)?;
        println!("Removed photo '{photo}' from message '{message}' (file kept).");
        return Ok(());
    }

    let config = WorkflowConfig::builder()
        .legacy_message_path(legacy)
        .build()
        .context("Invalid workflow configuration")?;

    match delete_message_photo_with_file(&mut store, &config, &session_id, &message_id, &photo_id)?
    {
        MessageDeleteOutcome::Removed { .. } => {
            println!("Removed photo '{photo}' from message '{message}' and deleted its file.");
        }
        MessageDeleteOutcome::Blocked { refs } => {
            println!("{}", "─".repeat(60));
            println!(" Blocked: the photo is still used elsewhere");
            println!("{}", "─".repeat(60));
            print_references(&refs);
            println!();
            println!("Nothing was deleted. Drop --delete-file to remove the");
            println!("reference only, or remove the usages above and retry.");
        }
    }

    Ok(())
}
