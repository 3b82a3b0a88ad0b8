use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote image reference. Two entries pointing at the same literal string
/// share one cache slot and one network attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogoUrl(String);

impl LogoUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for LogoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogoUrl {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Side {
    pub name: String,
    #[serde(default)]
    pub logo: Option<LogoUrl>,
}

impl Side {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logo: None,
        }
    }

    pub fn with_logo(mut self, url: impl Into<LogoUrl>) -> Self {
        self.logo = Some(url.into());
        self
    }

    /// The logo URL, if one is set and non-blank.
    pub fn logo_url(&self) -> Option<&LogoUrl> {
        self.logo.as_ref().filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedEntry {
    pub home: Side,
    pub away: Side,
    #[serde(default)]
    pub tournament: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl PairedEntry {
    pub fn new(home: Side, away: Side) -> Self {
        Self {
            home,
            away,
            tournament: None,
            time: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_tournament(mut self, tournament: impl Into<String>) -> Self {
        self.tournament = Some(tournament.into());
        self
    }

    /// True when either side carries the given team name.
    pub fn involves(&self, team: &str) -> bool {
        let team = team.trim();
        !team.is_empty()
            && [&self.home, &self.away]
                .iter()
                .any(|side| side.name.trim().eq_ignore_ascii_case(team))
    }
}

/// A free-text schedule line such as "Training" or "Press conference".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleEntry {
    pub label: String,
    pub time: String,
}

impl SingleEntry {
    pub fn new(label: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            time: time.into(),
        }
    }
}

/// One row of the rendered schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Paired(PairedEntry),
    Single(SingleEntry),
}

impl Entry {
    pub fn time(&self) -> Option<&str> {
        match self {
            Entry::Paired(paired) => paired.time.as_deref(),
            Entry::Single(single) => Some(single.time.as_str()),
        }
    }

    /// Logo URLs referenced by this entry, in home/away order.
    pub fn logo_urls(&self) -> impl Iterator<Item = &LogoUrl> {
        let sides = match self {
            Entry::Paired(paired) => [Some(&paired.home), Some(&paired.away)],
            Entry::Single(_) => [None, None],
        };
        sides.into_iter().flatten().filter_map(Side::logo_url)
    }
}

impl From<PairedEntry> for Entry {
    fn from(value: PairedEntry) -> Self {
        Entry::Paired(value)
    }
}

impl From<SingleEntry> for Entry {
    fn from(value: SingleEntry) -> Self {
        Entry::Single(value)
    }
}
