//! Markdown navigator: discovers markdown files under a root directory,
//! extracts their tags and serves filtered, paginated, folder-grouped views.

pub mod args;
pub mod cache;
pub mod config;
pub mod create;
pub mod discovery;
pub mod error;
pub mod formatting;
pub mod model;
pub mod query;
pub mod shared;
pub mod store;
pub mod tags;

#[cfg(test)]
mod test_support;

pub use cache::{CacheEntry, ResultCache};
pub use config::Config;
pub use create::{NewFile, Template, create_markdown_file};
pub use discovery::{ContentIndex, Discovery, Spotlight};
pub use error::{Error, Result};
pub use model::MarkdownFile;
pub use query::{LoadMore, PageView, QueryState};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use tags::{SystemTags, extract_tags};

use args::{ListFlags, NewFlags, TagsFlags};
use chrono::Local;
use formatting::{FormatContext, TimeFormatter};
use shared::table::render_table;
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub fn entry() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_help();
        return Ok(());
    }

    let cmd = args.remove(0);
    if matches!(cmd.as_str(), "help" | "-h" | "--help") {
        print_help();
        return Ok(());
    }

    let config = Config::from_env()?;
    config.ensure_root()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cmd.as_str() {
        "list" => runtime.block_on(list_files(args, &config))?,
        "tags" => runtime.block_on(list_tags(args, &config))?,
        "new" => new_file(args, &config)?,
        "path" => println!("{}", config.root.display()),
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MD_NAVIGATOR_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_help() {
    println!(
        "\
Markdown Navigator
Usage:
  md_navigator list [-s|--search <text>] [-t|--tag <tag>] [--page N] [--limit N]
                    [--refresh] [--show-color-tags]
                                  List markdown files grouped by folder, newest first
  md_navigator tags [--show-color-tags]
                                  List every tag with the number of files using it
  md_navigator new <title> [--template empty|basic|meeting|blog|project]
                   [-t|--tag <tag>]... [--folder <dir>]
                                  Create a markdown file from a template
  md_navigator path               Show the markdown root
  md_navigator help               Show this message

Environment:
  MD_NAVIGATOR_DIR                Markdown root (default: ~/Documents/Markdown)
  MD_NAVIGATOR_CACHE_DIR          Where discovery results are cached
  MD_NAVIGATOR_NO_INDEX           Skip the content index and walk the tree
  MD_NAVIGATOR_SEARCH_TIMEOUT_SECS
                                  Content index timeout (default: 10)
  MD_NAVIGATOR_SYSTEM_TAGS        Comma separated tags listed first
  MD_NAVIGATOR_LOG                Log filter, e.g. debug (default: warn)
  NO_COLOR                        Disable colors
"
    );
}

fn open_cache(config: &Config) -> ResultCache {
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.cache_dir));
    ResultCache::new(config, store)
}

async fn list_files(args: Vec<String>, config: &Config) -> Result<()> {
    let flags = ListFlags::parse(args)?;
    let cache = open_cache(config);
    let files = match flags.limit {
        Some(limit) => cache.get_limited(limit).await?,
        None if flags.refresh => cache.refresh().await?,
        None => cache.get_all().await?,
    };

    if files.is_empty() {
        println!("No markdown files under {}.", config.root.display());
        return Ok(());
    }

    let mut state = QueryState::new(config);
    if let Some(q) = flags.search {
        state.on_query_changed(q);
    }
    state.on_tag_changed(flags.tag.as_deref());
    state.page = flags.page;
    if flags.show_color_tags {
        state.toggle_color_tags();
    }

    let mut view = state.view(&files, config.page_size);
    if state.clamp_page(view.total_pages) {
        tracing::debug!(
            "Page {} is out of range, showing page {}",
            flags.page.saturating_add(1),
            state.page + 1
        );
        view = state.view(&files, config.page_size);
    }
    let ctx = FormatContext::from_env();
    let time = TimeFormatter::new(Local::now());
    let query = Some(state.search.as_str()).filter(|q| !q.is_empty());

    for group in &view.groups {
        println!("{}", ctx.format_folder(group.folder, group.files.len()));
        for file in &group.files {
            let mut shown = tags::filter_display_tags(&file.tags, state.show_color_tags);
            config.system_tags.sort(&mut shown);
            println!("{}", ctx.format_file_row(file, &time, &shown, query));
        }
    }

    println!("{}", ctx.format_muted(&view.info_text(files.len())));
    if view.total_pages > 1 {
        println!(
            "{}",
            ctx.format_muted(&format!("Page {} of {}", view.page + 1, view.total_pages))
        );
    }
    Ok(())
}

async fn list_tags(args: Vec<String>, config: &Config) -> Result<()> {
    let flags = TagsFlags::parse(args)?;
    let files = open_cache(config).get_all().await?;
    let vocabulary = tags::all_unique_tags(&files, flags.show_color_tags, &config.system_tags);
    if vocabulary.is_empty() {
        println!("No tags found.");
        return Ok(());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in files.iter().flat_map(|f| f.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }

    let ctx = FormatContext::from_env();
    let rows: Vec<Vec<String>> = vocabulary
        .iter()
        .map(|tag| {
            let count = counts.get(tag.as_str()).copied().unwrap_or_default();
            vec![ctx.format_tag(tag), count.to_string()]
        })
        .collect();
    println!("{}", render_table(&["TAG", "FILES"], &rows));
    Ok(())
}

fn new_file(args: Vec<String>, config: &Config) -> Result<()> {
    let flags = NewFlags::parse(args)?;
    let target_path = match &flags.folder {
        Some(folder) => config.root.join(folder),
        None => config.root.clone(),
    };
    let path = create_markdown_file(&NewFile {
        title: flags.title,
        template: flags.template,
        tags: flags.tags,
        target_path,
    })?;

    // the stored pass no longer matches the tree
    if let Err(e) = open_cache(config).invalidate() {
        tracing::warn!("Could not invalidate cache: {e}");
    }
    println!("Created {}", path.display());
    Ok(())
}
