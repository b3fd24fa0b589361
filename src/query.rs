//! Filtering, folder grouping and pagination over a discovered file set.
//!
//! Nothing here mutates the discovered files; every function derives a view
//! of borrowed records.

use crate::config::Config;
use crate::model::MarkdownFile;
use crate::tags::normalize_tag;

/// Per-session view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub search: String,
    pub selected_tag: Option<String>,
    pub page: usize,
    /// Discovery limit; only ever grows
    pub load_limit: usize,
    pub show_color_tags: bool,
    load_increment: usize,
}

/// Result of asking for more files to be discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    Increased { from: usize, to: usize },
    AllLoaded { total: usize },
}

impl QueryState {
    pub fn new(config: &Config) -> Self {
        Self {
            search: String::new(),
            selected_tag: None,
            page: 0,
            load_limit: config.initial_load_limit,
            show_color_tags: false,
            load_increment: config.load_increment,
        }
    }

    /// Replace the search text and go back to the first page.
    pub fn on_query_changed(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.page = 0;
    }

    /// Select or clear the tag filter and go back to the first page.
    pub fn on_tag_changed(&mut self, tag: Option<&str>) {
        self.selected_tag = tag
            .map(|t| normalize_tag(t.trim_start_matches('#')))
            .filter(|t| !t.is_empty());
        self.page = 0;
    }

    pub fn next_page(&mut self, total_pages: usize) -> bool {
        if self.page.saturating_add(1) < total_pages {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Pull an out-of-range page back to the last page. Returns whether the
    /// page changed.
    pub fn clamp_page(&mut self, total_pages: usize) -> bool {
        let last = total_pages.saturating_sub(1);
        if self.page > last {
            self.page = last;
            true
        } else {
            false
        }
    }

    pub fn toggle_color_tags(&mut self) -> bool {
        self.show_color_tags = !self.show_color_tags;
        self.show_color_tags
    }

    /// Raise the discovery limit by one increment, capped at `total_files`.
    pub fn load_more(&mut self, total_files: usize) -> LoadMore {
        if self.load_limit >= total_files {
            return LoadMore::AllLoaded { total: total_files };
        }
        let from = self.load_limit;
        let to = (from + self.load_increment).min(total_files);
        self.load_limit = to;
        tracing::info!("Increasing load limit from {from} to {to}");
        LoadMore::Increased { from, to }
    }

    pub fn view<'a>(&self, files: &'a [MarkdownFile], page_size: usize) -> PageView<'a> {
        build_page(
            files,
            &self.search,
            self.selected_tag.as_deref(),
            self.page,
            page_size,
        )
    }
}

/// Name or folder contains `query` (case-insensitive), and the tag set
/// holds `tag` exactly.
pub fn filter_files<'a>(
    files: &'a [MarkdownFile],
    query: &str,
    tag: Option<&str>,
) -> Vec<&'a MarkdownFile> {
    let needle = query.to_lowercase();
    files
        .iter()
        .filter(|f| {
            needle.is_empty()
                || f.name.to_lowercase().contains(&needle)
                || f.folder.to_lowercase().contains(&needle)
        })
        .filter(|f| tag.is_none_or(|t| f.has_tag(t)))
        .collect()
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// Slice for `page`; out-of-range pages are empty.
pub fn paginate<'s, T>(items: &'s [T], page: usize, page_size: usize) -> &'s [T] {
    let Some(start) = page.checked_mul(page_size) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderGroup<'a> {
    pub folder: &'a str,
    pub files: Vec<&'a MarkdownFile>,
}

/// Partition by folder, groups in order of first appearance.
pub fn group_by_folder<'a>(files: &[&'a MarkdownFile]) -> Vec<FolderGroup<'a>> {
    let mut groups: Vec<FolderGroup<'a>> = Vec::new();
    for &file in files {
        match groups.iter_mut().find(|g| g.folder == file.folder) {
            Some(group) => group.files.push(file),
            None => groups.push(FolderGroup {
                folder: file.folder.as_str(),
                files: vec![file],
            }),
        }
    }
    groups
}

/// One page of filtered, grouped results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub groups: Vec<FolderGroup<'a>>,
}

impl PageView<'_> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    pub fn start_item(&self) -> usize {
        self.page.saturating_mul(self.page_size).saturating_add(1)
    }

    pub fn end_item(&self) -> usize {
        self.page
            .saturating_add(1)
            .saturating_mul(self.page_size)
            .min(self.filtered_count)
    }

    pub fn info_text(&self, total_files: usize) -> String {
        if self.filtered_count == 0 {
            return "File not found".to_string();
        }
        format!(
            "Showing {}-{} of {} (Total {} files)",
            self.start_item(),
            self.end_item(),
            self.filtered_count,
            total_files
        )
    }
}

pub fn build_page<'a>(
    files: &'a [MarkdownFile],
    query: &str,
    tag: Option<&str>,
    page: usize,
    page_size: usize,
) -> PageView<'a> {
    let page_size = page_size.max(1);
    let filtered = filter_files(files, query, tag);
    PageView {
        page,
        page_size,
        total_pages: total_pages(filtered.len(), page_size),
        filtered_count: filtered.len(),
        groups: group_by_folder(paginate(&filtered, page, page_size)),
    }
}
