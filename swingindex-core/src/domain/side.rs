use serde::{Deserialize, Serialize};

/// Trade direction state of a position leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Flat: no exposure, waiting for the first entry.
    Initial,
    Long,
    Short,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Initial => "INITIAL",
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    /// The side a reversing signal moves this side to.
    ///
    /// `Initial` has no opposite; it only ever leaves via an entry signal.
    pub fn opposite(self) -> Option<Side> {
        match self {
            Side::Initial => None,
            Side::Long => Some(Side::Short),
            Side::Short => Some(Side::Long),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
