use crate::error::{Error, Result};
use crate::tags::normalize_tag;

pub struct ArgParser {
    iter: std::vec::IntoIter<String>,
    command_name: String,
}

impl ArgParser {
    pub fn new(args: Vec<String>, command_name: &str) -> Self {
        Self { iter: args.into_iter(), command_name: command_name.to_string() }
    }

    /// Extract a single tag from -t/--tag flag
    pub fn extract_tag(&mut self) -> Result<String> {
        let value = self.extract_value("-t/--tag")?;
        let tag = normalize_tag(value.trim_start_matches('#'));
        if tag.is_empty() {
            Err(Error::Other(format!("Invalid tag provided to {}", self.command_name)))
        } else {
            Ok(tag)
        }
    }

    /// Extract a string value for a flag
    pub fn extract_value(&mut self, flag: &str) -> Result<String> {
        self.iter.next().ok_or_else(|| {
            Error::Other(format!("Provide a value after {} for {}", flag, self.command_name))
        })
    }

    pub fn extract_number(&mut self, flag: &str) -> Result<usize> {
        let value = self.extract_value(flag)?;
        value.trim().parse().map_err(|_| {
            Error::Other(format!("{flag} expects a number, got {value:?}"))
        })
    }

    /// Get next positional argument
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.iter.next()
    }

    fn unknown(&self, flag: &str) -> Error {
        Error::Other(format!("Unknown flag for {}: {flag}", self.command_name))
    }
}

/// Flags for `list`
#[derive(Default, Debug, PartialEq, Eq)]
pub struct ListFlags {
    pub search: Option<String>,
    pub tag: Option<String>,
    /// Zero-based page
    pub page: usize,
    pub limit: Option<usize>,
    pub refresh: bool,
    pub show_color_tags: bool,
}

impl ListFlags {
    pub fn parse(args: Vec<String>) -> Result<Self> {
        let mut flags = Self::default();
        let mut parser = ArgParser::new(args, "list");
        while let Some(arg) = parser.next() {
            match arg.as_str() {
                "-s" | "--search" => flags.search = Some(parser.extract_value("-s/--search")?),
                "-t" | "--tag" => flags.tag = Some(parser.extract_tag()?),
                "--page" => {
                    let page = parser.extract_number("--page")?;
                    // pages are numbered from 1 on the command line
                    flags.page = page.saturating_sub(1);
                }
                "--limit" => flags.limit = Some(parser.extract_number("--limit")?),
                "--refresh" => flags.refresh = true,
                "--show-color-tags" => flags.show_color_tags = true,
                other => return Err(parser.unknown(other)),
            }
        }
        Ok(flags)
    }
}

/// Flags for `tags`
#[derive(Default, Debug, PartialEq, Eq)]
pub struct TagsFlags {
    pub show_color_tags: bool,
}

impl TagsFlags {
    pub fn parse(args: Vec<String>) -> Result<Self> {
        let mut flags = Self::default();
        let mut parser = ArgParser::new(args, "tags");
        while let Some(arg) = parser.next() {
            match arg.as_str() {
                "--show-color-tags" => flags.show_color_tags = true,
                other => return Err(parser.unknown(other)),
            }
        }
        Ok(flags)
    }
}

/// Flags for `new`; everything that is not a flag joins the title.
#[derive(Default, Debug, PartialEq, Eq)]
pub struct NewFlags {
    pub title: String,
    pub template: Option<String>,
    pub tags: Vec<String>,
    pub folder: Option<String>,
}

impl NewFlags {
    pub fn parse(args: Vec<String>) -> Result<Self> {
        let mut flags = Self::default();
        let mut title: Vec<String> = Vec::new();
        let mut parser = ArgParser::new(args, "new");
        while let Some(arg) = parser.next() {
            match arg.as_str() {
                "--template" => flags.template = Some(parser.extract_value("--template")?),
                "-t" | "--tag" => flags.tags.push(parser.extract_tag()?),
                "--folder" => flags.folder = Some(parser.extract_value("--folder")?),
                other if other.starts_with("--") => return Err(parser.unknown(other)),
                _ => title.push(arg),
            }
        }
        flags.title = title.join(" ");
        if flags.title.trim().is_empty() {
            return Err(Error::Other("Provide a title: new <title>".to_string()));
        }
        Ok(flags)
    }
}
