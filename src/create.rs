//! New markdown files from a small set of templates.

use crate::config::ensure_dir;
use crate::error::{Error, Result};
use crate::tags::{is_writable_tag, normalize_tag};
use chrono::{Local, NaiveDate};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const BASIC: &str = "# {{title}}

Created: {{date}}
Tags: {{tags}}

## Content

";

const MEETING: &str = "# Meeting: {{title}}

Date: {{date}}
Participants:
Tags: {{tags}}

## Agenda

-

## Notes

-

## Action Items

- [ ]
";

const BLOG: &str = "---
title: \"{{title}}\"
date: \"{{date}}\"
tags: [{{tags}}]
draft: true
---

# {{title}}

## Introduction

";

const PROJECT: &str = "# Project: {{title}}

Start Date: {{date}}
Status: Planning
Tags: {{tags}}

## Overview

## Goals

-

## Timeline

- [ ]

## Resources

-
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    Empty,
    #[default]
    Basic,
    Meeting,
    Blog,
    Project,
}

impl Template {
    pub const NAMES: [&'static str; 5] = ["empty", "basic", "meeting", "blog", "project"];

    /// Unknown names fall back to `basic`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "empty" => Template::Empty,
            "basic" => Template::Basic,
            "meeting" => Template::Meeting,
            "blog" => Template::Blog,
            "project" => Template::Project,
            other => {
                tracing::warn!("Unknown template {other:?}, using basic");
                Template::Basic
            }
        }
    }

    fn body(self) -> &'static str {
        match self {
            Template::Empty => "",
            Template::Basic => BASIC,
            Template::Meeting => MEETING,
            Template::Blog => BLOG,
            Template::Project => PROJECT,
        }
    }

    fn render_tags(self, tags: &[String]) -> String {
        match self {
            // frontmatter list
            Template::Blog => tags.join(", "),
            _ => tags
                .iter()
                .map(|t| format!("#{t}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn render(self, title: &str, tags: &[String], date: NaiveDate) -> String {
        self.body()
            .replace("{{title}}", title)
            .replace("{{date}}", &date.format("%Y-%m-%d").to_string())
            .replace("{{tags}}", &self.render_tags(tags))
    }
}

/// Request for a new file.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub title: String,
    pub template: Option<String>,
    pub tags: Vec<String>,
    pub target_path: PathBuf,
}

pub fn file_name_for(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("{stem}.md")
}

/// Write the rendered template into `target_path`, returning the new path.
pub fn create_markdown_file(request: &NewFile) -> Result<PathBuf> {
    create_markdown_file_on(request, Local::now().date_naive())
}

fn create_markdown_file_on(request: &NewFile, today: NaiveDate) -> Result<PathBuf> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(Error::Other("Provide a title for the new file".to_string()));
    }

    let template = request
        .template
        .as_deref()
        .map(Template::from_name)
        .unwrap_or_default();
    let tags = writable_tags(&request.tags)?;

    ensure_dir(&request.target_path)?;
    let path = request.target_path.join(file_name_for(title));
    write_new(&path, &template.render(title, &tags, today))?;
    tracing::info!("Created {}", path.display());
    Ok(path)
}

/// Normalize requested tags and reject any the extractor would not read back.
fn writable_tags(requested: &[String]) -> Result<Vec<String>> {
    let mut tags = Vec::with_capacity(requested.len());
    for raw in requested {
        let tag = normalize_tag(raw.trim_start_matches('#'));
        if tag.is_empty() {
            continue;
        }
        if !is_writable_tag(&tag) {
            return Err(Error::Other(format!(
                "{raw:?} is not a valid tag: use letters, digits, _ or CJK, joined by single hyphens"
            )));
        }
        tags.push(tag);
    }
    Ok(tags)
}

fn write_new(path: &Path, content: &str) -> Result<()> {
    let mut file = match fs::File::options().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::FileExists(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::extract_tags;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn request(dir: &Path, title: &str, template: Option<&str>, tags: &[&str]) -> NewFile {
        NewFile {
            title: title.to_string(),
            template: template.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            target_path: dir.to_path_buf(),
        }
    }

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_file_name_sanitizes_title() {
        assert_eq!(file_name_for("Weekly Sync: Q3/Plan"), "weekly-sync--q3-plan.md");
        assert_eq!(file_name_for("Café"), "caf-.md");
    }

    #[test]
    fn test_basic_template_tags_round_trip() {
        let tmp = tempdir().unwrap();
        let path =
            create_markdown_file_on(&request(tmp.path(), "Plan", None, &["Work", "#todo"]), day())
                .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Plan\n\nCreated: 2024-03-09\nTags: #work, #todo\n"));
        assert_eq!(extract_tags(&content), set(&["todo", "work"]));
    }

    #[test]
    fn test_blog_template_uses_frontmatter_tags() {
        let tmp = tempdir().unwrap();
        let path = create_markdown_file_on(
            &request(tmp.path(), "Launch Post", Some("blog"), &["release", "news"]),
            day(),
        )
        .unwrap();
        assert_eq!(path, tmp.path().join("launch-post.md"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("tags: [release, news]"));
        assert!(content.contains("date: \"2024-03-09\""));
        assert_eq!(extract_tags(&content), set(&["news", "release"]));
    }

    #[test]
    fn test_empty_and_unknown_templates() {
        let tmp = tempdir().unwrap();
        let empty =
            create_markdown_file_on(&request(tmp.path(), "blank", Some("empty"), &[]), day())
                .unwrap();
        assert_eq!(fs::read_to_string(empty).unwrap(), "");

        let fallback =
            create_markdown_file_on(&request(tmp.path(), "other", Some("nope"), &[]), day())
                .unwrap();
        assert!(fs::read_to_string(fallback).unwrap().starts_with("# other\n"));
    }

    #[test]
    fn test_meeting_and_project_templates() {
        let rendered = Template::Meeting.render("Sync", &["team".to_string()], day());
        assert!(rendered.starts_with("# Meeting: Sync\n\nDate: 2024-03-09\n"));
        assert_eq!(extract_tags(&rendered), set(&["team"]));

        let rendered = Template::Project.render("Atlas", &[], day());
        assert!(rendered.contains("Status: Planning"));
        assert!(extract_tags(&rendered).is_empty());
    }

    #[test]
    fn test_missing_folder_is_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("projects").join("2024");
        let path = create_markdown_file_on(&request(&target, "Atlas", Some("project"), &[]), day())
            .unwrap();
        assert!(path.is_file());
        assert_eq!(path.parent().unwrap(), target);
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("plan.md"), "keep me").unwrap();
        let err = create_markdown_file_on(&request(tmp.path(), "Plan", None, &[]), day())
            .unwrap_err();
        assert!(matches!(err, Error::FileExists(_)));
        assert_eq!(fs::read_to_string(tmp.path().join("plan.md")).unwrap(), "keep me");
    }

    #[test]
    fn test_accepted_tags_round_trip_in_every_template() {
        let tags = ["follow-up", "snake_case", "會議", "Q3"];
        for name in Template::NAMES.iter().filter(|n| **n != "empty") {
            let tmp = tempdir().unwrap();
            let path = create_markdown_file_on(
                &request(tmp.path(), "Tagged", Some(*name), &tags),
                day(),
            )
            .unwrap();
            let content = fs::read_to_string(path).unwrap();
            assert_eq!(
                extract_tags(&content),
                set(&["follow-up", "q3", "snake_case", "會議"]),
                "{name}"
            );
        }
    }

    #[test]
    fn test_unreadable_tags_are_rejected() {
        for bad in ["follow--up", "my tag", "c++", "fff", "2024"] {
            let tmp = tempdir().unwrap();
            let err = create_markdown_file_on(&request(tmp.path(), "Bad", None, &[bad]), day())
                .unwrap_err();
            assert!(matches!(err, Error::Other(_)), "{bad}");
            assert!(!tmp.path().join("bad.md").exists());
        }
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let tmp = tempdir().unwrap();
        let err = create_markdown_file_on(&request(tmp.path(), "   ", None, &[]), day())
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }
}
