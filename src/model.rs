use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const SHORT_ID_LEN: usize = 7;

/// A single commit as handed over by the history provider.
///
/// Fields that the provider could not read are left empty rather than
/// rejected; nothing downstream treats a missing author or message as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub message: String,
}

impl Commit {
    pub fn new(id: impl Into<String>, parents: &[&str]) -> Self {
        Self {
            id: id.into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: String::new(),
            email: String::new(),
            time: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            summary: String::new(),
            message: String::new(),
        }
    }

    pub fn with_author(mut self, name: &str, email: &str) -> Self {
        self.author = name.to_string();
        self.email = email.to_string();
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.summary = message.lines().next().unwrap_or_default().to_string();
        self.message = message.to_string();
        self
    }

    pub fn with_time(mut self, seconds: i64) -> Self {
        if let Some(time) = Utc.timestamp_opt(seconds, 0).single() {
            self.time = time;
        }
        self
    }

    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }

    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// `Name <email>` when an email is known, otherwise just the name.
    pub fn author_identity(&self) -> String {
        let name = if self.author.trim().is_empty() {
            "Unknown"
        } else {
            self.author.as_str()
        };
        if self.email.trim().is_empty() {
            name.to_string()
        } else {
            format!("{name} <{}>", self.email)
        }
    }

    pub fn full_message(&self) -> &str {
        if self.message.is_empty() {
            &self.summary
        } else {
            &self.message
        }
    }
}

/// A branch or tag pointing at a commit (annotated tags already peeled).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum RefLabel {
    Branch(String),
    Tag(String),
}

impl RefLabel {
    pub fn name(&self) -> &str {
        match self {
            RefLabel::Branch(name) | RefLabel::Tag(name) => name,
        }
    }

    pub fn branch_name(&self) -> Option<&str> {
        match self {
            RefLabel::Branch(name) => Some(name.trim()),
            RefLabel::Tag(_) => None,
        }
    }
}

impl fmt::Display for RefLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefLabel::Branch(name) => write!(f, "Branch {name}"),
            RefLabel::Tag(name) => write!(f, "Tag {name}"),
        }
    }
}

impl FromStr for RefLabel {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        if let Some(name) = raw.strip_prefix("Branch ") {
            Ok(RefLabel::Branch(name.trim().to_string()))
        } else if let Some(name) = raw.strip_prefix("Tag ") {
            Ok(RefLabel::Tag(name.trim().to_string()))
        } else {
            Err(anyhow!("unrecognised ref label '{raw}'"))
        }
    }
}

pub type RefsByCommit = HashMap<String, Vec<RefLabel>>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, scale: f32) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
        }
    }

    pub fn distance_squared(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn from_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            max_x: x + width,
            min_y: y,
            max_y: y + height,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        !self.is_empty()
            && point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_takes_seven_characters() {
        let commit = Commit::new("0123456789abcdef", &[]);
        assert_eq!(commit.short_id(), "0123456");

        let short = Commit::new("abc", &[]);
        assert_eq!(short.short_id(), "abc");
    }

    #[test]
    fn author_identity_includes_email_when_present() {
        let commit = Commit::new("a", &[]).with_author("Ada", "ada@example.com");
        assert_eq!(commit.author_identity(), "Ada <ada@example.com>");

        let anonymous = Commit::new("b", &[]);
        assert_eq!(anonymous.author_identity(), "Unknown");
    }

    #[test]
    fn full_message_falls_back_to_summary() {
        let mut commit = Commit::new("a", &[]);
        commit.summary = "subject".to_string();
        assert_eq!(commit.full_message(), "subject");

        let commit = commit.with_message("subject\n\nbody");
        assert_eq!(commit.full_message(), "subject\n\nbody");
        assert_eq!(commit.summary, "subject");
    }

    #[test]
    fn ref_labels_display_with_kind_prefix() {
        assert_eq!(RefLabel::Branch("main".into()).to_string(), "Branch main");
        assert_eq!(RefLabel::Tag("v1.0".into()).to_string(), "Tag v1.0");
        assert_eq!(
            "Branch feature".parse::<RefLabel>().unwrap(),
            RefLabel::Branch("feature".into())
        );
        assert!("Remote origin/main".parse::<RefLabel>().is_err());
    }

    #[test]
    fn empty_rect_contains_nothing() {
        let rect = Rect::default();
        assert!(!rect.contains(Point::new(0.0, 0.0)));

        let rect = Rect::from_origin(10.0, 10.0, 20.0, 5.0);
        assert!(rect.contains(Point::new(15.0, 12.0)));
        assert!(!rect.contains(Point::new(31.0, 12.0)));
    }
}
