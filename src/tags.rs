use crate::model::MarkdownFile;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

const SYSTEM_TAGS_DEFAULT: &str = "important,draft,complete,review,archive";

const TAG_CHARS: &str = r"[A-Za-z0-9_\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}\x{F900}-\x{FAFF}]+";

static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("#({TAG_CHARS}(?:-{TAG_CHARS})*)"))
        .expect("inline tag pattern is valid")
});

static TAG_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{TAG_CHARS}(?:-{TAG_CHARS})*$")).expect("tag token pattern is valid")
});

// `[[page]]`, `[[#heading]]`, `[[page#heading]]`
static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\[\]\n]*\]\]").expect("wiki link pattern is valid"));

/// Extract the normalized tag set from raw markdown text.
///
/// Inline `#tag` tokens and the frontmatter `tags:` entry are merged, then
/// color codes, pure numbers and empties are dropped and the rest is
/// lowercased. Tokens inside link syntax such as `[x](#anchor)` are skipped.
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    let mut candidates = inline_tags(content);
    if let Some(fm) = frontmatter(content) {
        candidates.extend(frontmatter_tags(fm));
    }
    candidates
        .into_iter()
        .filter(|t| is_valid_tag(t))
        .map(|t| normalize_tag(&t))
        .collect()
}

/// Read `path` and extract its tags. Read failures are logged and yield an
/// empty set so a single bad file never aborts a discovery pass.
pub async fn extract_tags_from_file(path: &Path) -> BTreeSet<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => extract_tags(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::warn!("Could not read tags from {}: {e}", path.display());
            BTreeSet::new()
        }
    }
}

pub fn normalize_tag(t: &str) -> String {
    t.trim().to_lowercase()
}

/// Whether `tag` survives being written as `#tag` and read back unchanged.
pub fn is_writable_tag(tag: &str) -> bool {
    TAG_TOKEN.is_match(tag) && is_valid_tag(tag) && tag == normalize_tag(tag)
}

/// 3 or 6 hex digits, e.g. `fff` or `aabbcc`.
pub fn is_color_tag(tag: &str) -> bool {
    matches!(tag.len(), 3 | 6) && tag.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_numeric_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_tag(tag: &str) -> bool {
    let t = tag.trim();
    !t.is_empty() && !is_color_tag(t) && !is_numeric_tag(t)
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || matches!(c, '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}')
}

fn inline_tags(content: &str) -> Vec<String> {
    let links = link_spans(content);
    let mut tags = Vec::new();
    for cap in INLINE_TAG.captures_iter(content) {
        let Some(whole) = cap.get(0) else { continue };
        if links.iter().any(|span| span.contains(&whole.start())) {
            continue;
        }
        let before = content[..whole.start()].chars().next_back();
        // `[#x` opens link text or a reference, not a tag
        if before.is_some_and(|c| is_tag_char(c) || matches!(c, '#' | '&' | '[')) {
            continue;
        }
        // `#a--b` is not a whole token
        let mut after = content[whole.end()..].chars();
        if after.next() == Some('-')
            && after.next().is_some_and(|c| c == '-' || is_tag_char(c))
        {
            continue;
        }
        tags.push(cap[1].to_string());
    }
    tags
}

/// Byte ranges covered by markdown links and images (text and destination)
/// and by wiki links.
fn link_spans(content: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = Parser::new(content)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {
                Some(range)
            }
            _ => None,
        })
        .collect();
    spans.extend(WIKI_LINK.find_iter(content).map(|m| m.range()));
    spans
}

/// Body of a `---` delimited block at the very start of the document.
fn frontmatter(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

fn frontmatter_tags(fm: &str) -> Vec<String> {
    let mut lines = fm.lines();
    while let Some(line) = lines.next() {
        let Some(value) = line.trim_start().strip_prefix("tags:") else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            return lines
                .map(str::trim)
                .take_while(|l| l.starts_with('-'))
                .map(|l| clean_list_item(&l[1..]))
                .filter(|t| !t.is_empty())
                .collect();
        }
        let list = match value.strip_prefix('[') {
            Some(inner) => inner.split(']').next().unwrap_or(inner),
            None => value,
        };
        return list
            .split(',')
            .map(clean_list_item)
            .filter(|t| !t.is_empty())
            .collect();
    }
    Vec::new()
}

fn clean_list_item(item: &str) -> String {
    item.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .trim_start_matches('#')
        .to_string()
}

/// Tags that sort ahead of every other tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTags(Vec<String>);

impl Default for SystemTags {
    fn default() -> Self {
        Self::parse(SYSTEM_TAGS_DEFAULT)
    }
}

impl SystemTags {
    pub fn new(tags: impl IntoIterator<Item = String>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = normalize_tag(&tag).trim_start_matches('#').to_string();
            if !tag.is_empty() && !out.contains(&tag) {
                out.push(tag);
            }
        }
        Self(out)
    }

    /// Parse a comma separated list such as `important,draft`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::to_string))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// System tags first, then plain lexicographic order.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.contains(a), self.contains(b)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.cmp(b),
        }
    }

    pub fn sort(&self, tags: &mut [String]) {
        tags.sort_by(|a, b| self.compare(a, b));
    }
}

/// Every tag used across `files`, sorted with system tags first.
pub fn all_unique_tags(
    files: &[MarkdownFile],
    show_color_tags: bool,
    system: &SystemTags,
) -> Vec<String> {
    let unique: BTreeSet<&String> = files
        .iter()
        .flat_map(|f| f.tags.iter())
        .filter(|t| show_color_tags || !is_color_tag(t))
        .collect();
    let mut tags: Vec<String> = unique.into_iter().cloned().collect();
    system.sort(&mut tags);
    tags
}

pub fn filter_display_tags<'a, I>(tags: I, show_color_tags: bool) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    tags.into_iter()
        .filter(|t| show_color_tags || !is_color_tag(t))
        .cloned()
        .collect()
}

/// Hash a tag for deterministic color selection
pub fn hash_tag(tag: &str) -> u64 {
    let mut h: u64 = 5381;
    for b in tag.bytes() {
        h = (h.wrapping_shl(5)).wrapping_add(h) ^ u64::from(b);
    }
    h
}

/// Fixed colors for the default system tags, hashed palette otherwise.
pub fn color_for_tag(tag: &str) -> (u8, u8, u8) {
    match tag {
        "important" => (243, 139, 168),
        "draft" => (249, 226, 175),
        "complete" => (166, 227, 161),
        "review" => (250, 179, 135),
        "archive" => (137, 180, 250),
        _ => {
            const PALETTE: &[(u8, u8, u8)] = &[
                (148, 226, 213),
                (245, 194, 231),
                (198, 160, 246),
                (181, 232, 224),
                (183, 189, 248),
                (255, 214, 165),
                (186, 225, 255),
                (211, 228, 205),
            ];
            PALETTE[(hash_tag(tag) as usize) % PALETTE.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::path::PathBuf;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_drops_numeric_and_color_tokens() {
        let tags = extract_tags("Plan #projectplan then #123 and #ffffff.");
        assert_eq!(tags, set(&["projectplan"]));
    }

    #[test]
    fn test_frontmatter_case_insensitive_dedup() {
        let tags = extract_tags("---\ntags: [Work, work, WORK]\n---\nbody\n");
        assert_eq!(tags, set(&["work"]));
    }

    #[test]
    fn test_anchor_links_are_not_tags() {
        let only_link = extract_tags("See [link](#section) for details.");
        assert!(only_link.is_empty());

        let both = extract_tags("See [link](#section).\n\nAlso #section here.");
        assert_eq!(both, set(&["section"]));
    }

    #[test]
    fn test_tag_in_link_text_is_skipped() {
        let tags = extract_tags("[about #todo](https://example.com) #real");
        assert_eq!(tags, set(&["real"]));
    }

    #[test]
    fn test_wiki_anchors_are_not_tags() {
        assert!(extract_tags("[[#heading]]").is_empty());
        assert!(extract_tags("jump to [[note#anchor]] or [[other note #part]]").is_empty());
        assert_eq!(extract_tags("[[Page]] then #real"), set(&["real"]));
    }

    #[test]
    fn test_hash_right_after_open_bracket_is_skipped() {
        assert!(extract_tags("see [#todo] later").is_empty());
        assert!(extract_tags("unclosed [#draft and more").is_empty());
        assert_eq!(extract_tags("[x] #done"), set(&["done"]));
    }

    #[test]
    fn test_writable_tags_match_inline_grammar() {
        for tag in ["todo", "follow-up", "snake_case", "會議", "中文-筆記", "v2"] {
            assert!(is_writable_tag(tag), "{tag}");
            assert_eq!(extract_tags(&format!("Tags: #{tag}")), set(&[tag]));
        }
        for tag in ["follow--up", "my tag", "c++", "-lead", "trail-", "", "123", "fff", "ToDo"] {
            assert!(!is_writable_tag(tag), "{tag}");
        }
    }

    #[test]
    fn test_frontmatter_scalar_and_quotes() {
        let tags =
            extract_tags("---\ntitle: x\ntags: \"alpha\", 'Beta' , gamma\n---\n");
        assert_eq!(tags, set(&["alpha", "beta", "gamma"]));
    }

    #[test]
    fn test_frontmatter_block_list() {
        let content = "---\ntags:\n  - One\n  - \"#two\"\ndate: today\n---\n";
        assert_eq!(extract_tags(content), set(&["one", "two"]));
    }

    #[test]
    fn test_frontmatter_must_open_document() {
        let tags = extract_tags("intro\n---\ntags: [late]\n---\n");
        assert!(tags.is_empty());
    }

    #[test]
    fn test_frontmatter_filters_apply() {
        let tags = extract_tags("---\ntags: [Draft, 42, aabbcc]\n---\n");
        assert_eq!(tags, set(&["draft"]));
    }

    #[test]
    fn test_inline_hyphen_and_cjk() {
        let tags = extract_tags("#follow-up #會議 #a--b #中文-筆記");
        assert_eq!(tags, set(&["follow-up", "會議", "中文-筆記"]));
    }

    #[test]
    fn test_headings_and_word_boundaries() {
        let tags = extract_tags("# Heading\n## Sub\nissue#42 abc#def ##twice &#x27; #ok");
        assert_eq!(tags, set(&["ok"]));
    }

    #[test]
    fn test_mixed_case_inline_normalized() {
        let tags = extract_tags("#ToDo and #todo and #TODO");
        assert_eq!(tags, set(&["todo"]));
    }

    #[test]
    fn test_is_color_tag() {
        assert!(is_color_tag("fff"));
        assert!(is_color_tag("A1B2C3"));
        assert!(!is_color_tag("ffff"));
        assert!(!is_color_tag("ggg"));
    }

    #[test]
    fn test_system_tags_sort_first() {
        let system = SystemTags::default();
        let mut tags = vec![
            "alpha".to_string(),
            "review".to_string(),
            "zeta".to_string(),
            "draft".to_string(),
        ];
        system.sort(&mut tags);
        assert_eq!(tags, vec!["draft", "review", "alpha", "zeta"]);
    }

    #[test]
    fn test_system_tags_parse_normalizes() {
        let system = SystemTags::parse(" #Urgent, later,,urgent ");
        assert_eq!(system.as_slice(), &["urgent".to_string(), "later".to_string()]);
    }

    #[test]
    fn test_all_unique_tags_and_display_filter() {
        let now = Local::now();
        let root = Path::new("/n");
        let files = vec![
            MarkdownFile::new(PathBuf::from("/n/a.md"), root, now, set(&["todo", "abc"])),
            MarkdownFile::new(PathBuf::from("/n/b.md"), root, now, set(&["important", "todo"])),
        ];
        let system = SystemTags::default();
        assert_eq!(
            all_unique_tags(&files, false, &system),
            vec!["important", "todo"]
        );
        assert_eq!(
            all_unique_tags(&files, true, &system),
            vec!["important", "abc", "todo"]
        );
        let shown = filter_display_tags(&files[0].tags, false);
        assert_eq!(shown, vec!["todo"]);
    }

    #[tokio::test]
    async fn test_unreadable_file_yields_empty_set() {
        let tags = extract_tags_from_file(Path::new("/definitely/missing.md")).await;
        assert!(tags.is_empty());
    }

    #[test]
    fn test_color_for_tag_consistent() {
        assert_eq!(color_for_tag("work"), color_for_tag("work"));
        assert_eq!(color_for_tag("draft"), (249, 226, 175));
    }
}
