//! Command-line front end: renders the project list and drives the store and
//! the generation flows.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::ai::flows;
use crate::ai::media::{self, MediaFile};
use crate::config::AppConfig;
use crate::project::{
    factory, ContentItem, ContentKind, ContentPayload, IdeaSpark, MoodBoard, Project,
    ProjectRepository, ProjectStore, StoreError,
};

#[derive(Parser, Debug)]
#[clap(
    name = "mediaspark",
    version,
    about = "Spark story ideas, web insights and mood boards, and keep them in projects."
)]
pub struct Cli {
    /// Directory holding config.json and the project store.
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, rename, delete and inspect projects
    Projects {
        #[clap(subcommand)]
        command: ProjectsCommand,
    },
    /// Rate or remove saved content
    Content {
        #[clap(subcommand)]
        command: ContentCommand,
    },
    /// Generate story ideas from media and notes
    Spark {
        /// Ideas, themes or context for the model
        #[clap(long, default_value = "")]
        notes: String,
        /// Image or text files to draw inspiration from
        #[clap(long = "media")]
        media: Vec<PathBuf>,
        #[clap(flatten)]
        save: SaveTarget,
    },
    /// Summarize filmmaking insights across web pages
    Insight {
        #[clap(required = true)]
        urls: Vec<String>,
        #[clap(flatten)]
        save: SaveTarget,
    },
    /// Generate a visual mood board from keywords
    Moodboard {
        /// Keywords or a theme, e.g. "nostalgic summer evenings"
        #[clap(long)]
        keywords: String,
        /// Reference images
        #[clap(long = "media")]
        media: Vec<PathBuf>,
        /// Write the generated images into this directory
        #[clap(long)]
        out: Option<PathBuf>,
        #[clap(flatten)]
        save: SaveTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List all projects
    List,
    /// Create a new project
    Create { name: String },
    /// Rename a project (by id or name)
    Rename { project: String, name: String },
    /// Delete a project and everything saved in it
    Delete { project: String },
    /// Show a project's saved content
    Show { project: String },
}

#[derive(Subcommand, Debug)]
pub enum ContentCommand {
    /// Remove an item from a project
    Remove {
        project: String,
        /// ideaSparks, webInsights or moodBoards
        kind: ContentKind,
        content_id: String,
    },
    /// Rate an item from 1 to 5
    Rate {
        project: String,
        kind: ContentKind,
        content_id: String,
        rating: u8,
    },
}

/// Where a generated result is saved, if anywhere.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct SaveTarget {
    /// Save the result into this project (id or name)
    #[clap(long, conflicts_with = "new_project")]
    pub project: Option<String>,
    /// Create a project with this name and save the result into it
    #[clap(long)]
    pub new_project: Option<String>,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => AppConfig::default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let config = AppConfig::load(&data_dir);
    let mut store = crate::open_store(&config, &data_dir)?;
    let now = factory::now_millis();

    match cli.command {
        Command::Projects { command } => run_projects(&mut store, command, now)?,
        Command::Content { command } => run_content(&mut store, command)?,
        Command::Spark { notes, media, save } => {
            check_save_target(&store, &save)?;
            let media = load_media(&media)?;
            let result = flows::idea_spark(&config, &media, &notes).await?;
            print!("{}", render_idea_spark(&result, usize::MAX));
            report_saved(save_result(&mut store, &save, result)?);
        }
        Command::Insight { urls, save } => {
            check_save_target(&store, &save)?;
            let result = flows::web_insight(&config, &urls).await?;
            println!("{}", result.summary);
            report_saved(save_result(&mut store, &save, result)?);
        }
        Command::Moodboard {
            keywords,
            media,
            out,
            save,
        } => {
            check_save_target(&store, &save)?;
            let media = load_media(&media)?;
            let result = flows::mood_board(&config, &media, &keywords).await?;
            if let Some(explanation) = &result.explanation {
                println!("{}", explanation);
            }
            match out {
                Some(dir) => {
                    for path in write_images(&result.generated_images, &dir)? {
                        println!("  {}", path.display());
                    }
                }
                None => println!("{} image(s) generated", result.generated_images.len()),
            }
            report_saved(save_result(&mut store, &save, result)?);
        }
    }

    Ok(())
}

fn run_projects<R: ProjectRepository>(
    store: &mut ProjectStore<R>,
    command: ProjectsCommand,
    now: i64,
) -> anyhow::Result<()> {
    match command {
        ProjectsCommand::List => print!("{}", render_project_list(store.projects(), now)),
        ProjectsCommand::Create { name } => {
            let project = store.create_project(&name)?;
            println!("Project \"{}\" created ({})", project.name, project.id);
        }
        ProjectsCommand::Rename { project, name } => {
            let id = resolve_project(store, &project)?.id.clone();
            store.update_project_name(&id, &name)?;
            println!("Project renamed to \"{}\"", name.trim());
        }
        ProjectsCommand::Delete { project } => {
            // Unknown projects are a silent no-op, like the store itself.
            let id = resolve_project(store, &project)
                .map(|p| p.id.clone())
                .unwrap_or(project);
            if store.delete_project(&id) {
                println!("Project deleted");
            }
        }
        ProjectsCommand::Show { project } => {
            let project = resolve_project(store, &project)?;
            print!("{}", render_project(project, now));
        }
    }
    Ok(())
}

fn run_content<R: ProjectRepository>(
    store: &mut ProjectStore<R>,
    command: ContentCommand,
) -> anyhow::Result<()> {
    match command {
        ContentCommand::Remove {
            project,
            kind,
            content_id,
        } => {
            let id = resolve_project(store, &project)?.id.clone();
            if store.remove_content(&id, kind, &content_id)? {
                println!("Content removed");
            }
        }
        ContentCommand::Rate {
            project,
            kind,
            content_id,
            rating,
        } => {
            let id = resolve_project(store, &project)?.id.clone();
            if store.rate_content(&id, kind, &content_id, rating)? {
                println!("Content rating updated");
            }
        }
    }
    Ok(())
}

/// Looks a project up by id first, then by exact name.
pub fn resolve_project<'a, R: ProjectRepository>(
    store: &'a ProjectStore<R>,
    key: &str,
) -> Result<&'a Project, StoreError> {
    store
        .get_project(key)
        .or_else(|| store.projects().iter().find(|p| p.name == key.trim()))
        .ok_or_else(|| StoreError::ProjectNotFound(key.to_string()))
}

/// Rejects a save target that `save_result` would refuse, so the check
/// happens before any generation is paid for.
pub fn check_save_target<R: ProjectRepository>(
    store: &ProjectStore<R>,
    target: &SaveTarget,
) -> Result<(), StoreError> {
    if let Some(name) = &target.new_project {
        store.check_new_name(name)?;
    } else if let Some(key) = &target.project {
        resolve_project(store, key)?;
    }
    Ok(())
}

/// Saves a generated result as the target asks. Returns the project id and
/// new content id, or `None` when no target was given.
pub fn save_result<R: ProjectRepository>(
    store: &mut ProjectStore<R>,
    target: &SaveTarget,
    payload: impl Into<ContentPayload>,
) -> anyhow::Result<Option<(String, String)>> {
    let project_id = if let Some(name) = &target.new_project {
        store.create_project(name)?.id
    } else if let Some(key) = &target.project {
        resolve_project(store, key)?.id.clone()
    } else {
        return Ok(None);
    };

    let content_id = store.add_content(&project_id, payload)?;
    Ok(Some((project_id, content_id)))
}

fn report_saved(saved: Option<(String, String)>) {
    if let Some((project_id, content_id)) = saved {
        println!("Saved as {} in project {}", content_id, project_id);
    }
}

fn load_media(paths: &[PathBuf]) -> anyhow::Result<Vec<MediaFile>> {
    paths.iter().map(|p| MediaFile::load(p)).collect()
}

fn write_images(images: &[String], dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = Vec::new();
    for (i, image) in images.iter().enumerate() {
        let Some((mime, bytes)) = media::decode_data_uri(image) else {
            log::warn!("Skipping image {} that is not an inline data URI", i + 1);
            continue;
        };
        let path = dir.join(format!("mood-{}.{}", i + 1, media::extension_for(&mime)));
        std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// "just now", "5 minutes ago", "3 days ago".
pub fn format_relative(then_ms: i64, now_ms: i64) -> String {
    let secs = now_ms.saturating_sub(then_ms).max(0) / 1000;
    let (value, unit) = match secs {
        0..=44 => return "just now".to_string(),
        45..=3_599 => ((secs + 30) / 60, "minute"),
        3_600..=86_399 => ((secs + 1_800) / 3_600, "hour"),
        86_400..=2_591_999 => ((secs + 43_200) / 86_400, "day"),
        2_592_000..=31_535_999 => ((secs + 1_296_000) / 2_592_000, "month"),
        _ => (secs / 31_536_000, "year"),
    };
    let value = value.max(1);
    if value == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", value, unit)
    }
}

fn format_date(ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn stars(rating: Option<u8>) -> String {
    match rating {
        Some(r) => {
            let r = r.min(5) as usize;
            format!("{}{}", "★".repeat(r), "☆".repeat(5 - r))
        }
        None => "unrated".to_string(),
    }
}

pub fn render_project_list(projects: &[Project], now: i64) -> String {
    if projects.is_empty() {
        return "You haven't created any projects yet.\n".to_string();
    }

    let mut out = String::new();
    for project in projects {
        out.push_str(&format!(
            "{}  {}\n    {} | Last updated: {}\n",
            project.id,
            project.name,
            project.counts(),
            format_relative(project.updated_at, now)
        ));
    }
    out
}

pub fn render_project(project: &Project, now: i64) -> String {
    let mut out = format!(
        "{}\nCreated: {} | Last updated: {}\n",
        project.name,
        format_date(project.created_at),
        format_relative(project.updated_at, now)
    );

    for kind in ContentKind::ALL {
        out.push_str(&format!("\n[{}] {}\n", kind, project.len(kind)));
        match kind {
            ContentKind::IdeaSparks => {
                for item in &project.idea_sparks {
                    out.push_str(&item_header(item, kind, now));
                    out.push_str(&render_idea_spark(&item.data, 3));
                }
            }
            ContentKind::WebInsights => {
                for item in &project.web_insights {
                    out.push_str(&item_header(item, kind, now));
                    out.push_str(&format!("    {}\n", item.data.summary));
                }
            }
            ContentKind::MoodBoards => {
                for item in &project.mood_boards {
                    out.push_str(&item_header(item, kind, now));
                    out.push_str(&render_mood_board(&item.data));
                }
            }
        }
    }
    out
}

fn item_header<T>(item: &ContentItem<T>, kind: ContentKind, now: i64) -> String {
    format!(
        "  {} - {} - {} ({})\n",
        kind.label(),
        format_relative(item.timestamp, now),
        stars(item.rating),
        item.id
    )
}

fn render_idea_spark(idea: &IdeaSpark, limit: usize) -> String {
    let mut out = String::new();
    for story in idea.story_ideas.iter().take(limit) {
        out.push_str(&format!("    - {}\n", story));
    }
    if idea.story_ideas.len() > limit {
        out.push_str("    ...and more\n");
    }
    out
}

fn render_mood_board(board: &MoodBoard) -> String {
    let mut out = format!(
        "    \"{}\" - {} image(s)\n",
        board.keywords,
        board.generated_images.len()
    );
    if let Some(explanation) = &board.explanation {
        out.push_str(&format!("    {}\n", explanation));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{KvProjectRepository, WebInsight};
    use crate::storage::MemoryBackend;

    fn store() -> ProjectStore<KvProjectRepository<MemoryBackend>> {
        ProjectStore::open(KvProjectRepository::new(MemoryBackend::new()))
    }

    fn insight() -> WebInsight {
        WebInsight {
            urls: vec!["https://example.com".to_string()],
            summary: "Practical lighting tips".to_string(),
        }
    }

    #[test]
    fn test_relative_times() {
        let now = 1_700_000_000_000;
        assert_eq!(format_relative(now, now), "just now");
        assert_eq!(format_relative(now + 5_000, now), "just now");
        assert_eq!(format_relative(now - 60_000, now), "1 minute ago");
        assert_eq!(format_relative(now - 5 * 60_000, now), "5 minutes ago");
        assert_eq!(format_relative(now - 3 * 3_600_000, now), "3 hours ago");
        assert_eq!(format_relative(now - 2 * 86_400_000, now), "2 days ago");
    }

    #[test]
    fn test_relative_time_at_timestamp_extremes() {
        assert_eq!(format_relative(i64::MAX, i64::MIN), "just now");
        assert!(format_relative(i64::MIN, i64::MAX).ends_with("years ago"));
    }

    #[test]
    fn test_save_into_new_project() {
        let mut store = store();
        let target = SaveTarget {
            project: None,
            new_project: Some(" Research ".to_string()),
        };

        let (project_id, content_id) = save_result(&mut store, &target, insight()).unwrap().unwrap();
        let project = store.get_project(&project_id).unwrap();
        assert_eq!(project.name, "Research");
        assert_eq!(project.web_insights[0].id, content_id);
    }

    #[test]
    fn test_save_into_existing_project_by_name() {
        let mut store = store();
        let project = store.create_project("Docu").unwrap();
        let target = SaveTarget {
            project: Some("Docu".to_string()),
            new_project: None,
        };

        let (project_id, _) = save_result(&mut store, &target, insight()).unwrap().unwrap();
        assert_eq!(project_id, project.id);
    }

    #[test]
    fn test_save_without_target_is_skipped() {
        let mut store = store();
        assert_eq!(save_result(&mut store, &SaveTarget::default(), insight()).unwrap(), None);
        assert!(store.projects().is_empty());
    }

    #[test]
    fn test_save_into_unknown_project_fails() {
        let mut store = store();
        let target = SaveTarget {
            project: Some("ghost".to_string()),
            new_project: None,
        };
        assert!(save_result(&mut store, &target, insight()).is_err());
    }

    #[test]
    fn test_save_target_checked_up_front() {
        let mut store = store();
        store.create_project("Docu").unwrap();
        let target = |project: Option<&str>, new_project: Option<&str>| SaveTarget {
            project: project.map(String::from),
            new_project: new_project.map(String::from),
        };

        assert!(check_save_target(&store, &target(None, None)).is_ok());
        assert!(check_save_target(&store, &target(Some("Docu"), None)).is_ok());
        assert!(check_save_target(&store, &target(None, Some("Fresh"))).is_ok());
        assert_eq!(
            check_save_target(&store, &target(Some("ghost"), None)),
            Err(StoreError::ProjectNotFound("ghost".to_string()))
        );
        assert_eq!(
            check_save_target(&store, &target(None, Some(" Docu "))),
            Err(StoreError::DuplicateName("Docu".to_string()))
        );
        assert_eq!(
            check_save_target(&store, &target(None, Some("  "))),
            Err(StoreError::EmptyName)
        );
        assert_eq!(store.projects().len(), 1);
    }

    #[test]
    fn test_render_project() {
        let mut store = store();
        let project = store.create_project("Noir").unwrap();
        let id = store
            .add_content(
                &project.id,
                IdeaSpark {
                    input_notes: String::new(),
                    input_media_names: vec![],
                    story_ideas: vec!["a", "b", "c", "d"].into_iter().map(String::from).collect(),
                },
            )
            .unwrap();
        store.rate_content(&project.id, ContentKind::IdeaSparks, &id, 4).unwrap();

        let project = store.get_project(&project.id).unwrap();
        let now = project.updated_at;
        let text = render_project(project, now);
        assert!(text.starts_with("Noir\n"));
        assert!(text.contains("[ideaSparks] 1"));
        assert!(text.contains("★★★★☆"));
        assert!(text.contains("    - c\n    ...and more\n"));
        assert!(!text.contains("    - d\n"));

        let list = render_project_list(store.projects(), now);
        assert!(list.contains("1 Ideas, 0 Insights, 0 Boards"));
    }

    #[test]
    fn test_empty_list_message() {
        assert_eq!(render_project_list(&[], 0), "You haven't created any projects yet.\n");
    }

    #[test]
    fn test_cli_parses_rate_command() {
        let cli = Cli::parse_from([
            "mediaspark", "content", "rate", "Noir", "ideaSparks", "abc", "5",
        ]);
        match cli.command {
            Command::Content {
                command:
                    ContentCommand::Rate {
                        kind, rating, ..
                    },
            } => {
                assert_eq!(kind, ContentKind::IdeaSparks);
                assert_eq!(rating, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_both_save_targets() {
        let result = Cli::try_parse_from([
            "mediaspark", "insight", "https://example.com", "--project", "a", "--new-project", "b",
        ]);
        assert!(result.is_err());
    }
}
