//! Keyword-based application categories.
//!
//! An application is classified by searching its name and window title
//! (lower-cased, joined by a space) for known keywords. Categories are tried
//! in declaration order and the first hit wins, so a browser tab titled
//! "YouTube" counts as entertainment rather than browsing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Productivity,
    Social,
    Entertainment,
    Browsing,
    Creativity,
    Reading,
    Other,
}

const RULES: &[(Category, &[&str])] = &[
    (
        Category::Productivity,
        &[
            "code",
            "visual studio",
            "vscode",
            "figma",
            "notion",
            "excel",
            "word",
            "powerpoint",
            "slack",
            "outlook",
            "mail",
            "numbers",
            "terminal",
            "cursor",
            "intellij",
            "pycharm",
            "webstorm",
            "sublime",
            "atom",
            "notepad++",
            "vim",
            "postman",
            "docker",
            "kubernetes",
            "libreoffice",
            "obsidian",
            "trello",
            "asana",
            "jira",
            "github",
            "gitkraken",
        ],
    ),
    (
        Category::Social,
        &["whatsapp", "discord", "telegram", "messenger", "zoom", "teams", "signal", "skype"],
    ),
    (
        Category::Entertainment,
        &[
            "spotify",
            "youtube",
            "netflix",
            "steam",
            "game",
            "vlc",
            "twitch",
            "epic games",
            "minecraft",
            "league of legends",
            "valorant",
            "fortnite",
        ],
    ),
    (
        Category::Browsing,
        &["chrome", "firefox", "safari", "edge", "brave", "opera", "vivaldi"],
    ),
    (
        Category::Creativity,
        &[
            "photoshop",
            "illustrator",
            "sketch",
            "blender",
            "inkscape",
            "gimp",
            "premiere",
            "after effects",
            "davinci",
            "audacity",
            "fl studio",
            "ableton",
            "logic pro",
        ],
    ),
    (
        Category::Reading,
        &["kindle", "calibre", "adobe reader", "pdf", "reader", "books", "pocket"],
    ),
];

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Productivity,
        Category::Social,
        Category::Entertainment,
        Category::Browsing,
        Category::Creativity,
        Category::Reading,
        Category::Other,
    ];

    /// Classifies an application by name and window title.
    pub fn of(name: &str, title: &str) -> Category {
        let haystack = format!("{} {}", name, title).to_lowercase();

        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Other)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Productivity => "💻",
            Category::Social => "💬",
            Category::Entertainment => "🎮",
            Category::Browsing => "🌐",
            Category::Creativity => "🎨",
            Category::Reading => "📚",
            Category::Other => "⚙️",
        }
    }

    /// Zeroed totals for every category.
    pub fn empty_totals() -> BTreeMap<Category, u64> {
        Self::ALL.iter().map(|category| (*category, 0)).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Productivity => "Productivity",
            Category::Social => "Social",
            Category::Entertainment => "Entertainment",
            Category::Browsing => "Browsing",
            Category::Creativity => "Creativity",
            Category::Reading => "Reading",
            Category::Other => "Other",
        };
        write!(f, "{}", name)
    }
}
