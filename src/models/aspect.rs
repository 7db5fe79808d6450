use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::StudioError;

/// Output shapes the image model accepts. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Widescreen,
        AspectRatio::Vertical,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Vertical => "9:16",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Portrait => "3:4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "Square",
            AspectRatio::Widescreen => "Widescreen",
            AspectRatio::Vertical => "Vertical",
            AspectRatio::Landscape => "Landscape",
            AspectRatio::Portrait => "Portrait",
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Widescreen => (16, 9),
            AspectRatio::Vertical => (9, 16),
            AspectRatio::Landscape => (4, 3),
            AspectRatio::Portrait => (3, 4),
        }
    }

    /// Path- and filename-safe form, e.g. `16-9`.
    pub fn slug(&self) -> String {
        let (w, h) = self.dimensions();
        format!("{}-{}", w, h)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = StudioError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().replace(['x', 'X', '-', '/', '_'], ":");
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == normalized)
            .ok_or_else(|| {
                StudioError::InvalidState(format!(
                    "unknown aspect ratio '{}', expected one of {}",
                    raw,
                    AspectRatio::ALL.map(|r| r.as_str()).join(", ")
                ))
            })
    }
}

/// The ratios a user has picked. Iterates in catalog order regardless of click order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AspectRatioSelection {
    ratios: BTreeSet<AspectRatio>,
}

impl AspectRatioSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the ratio if absent, removes it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, ratio: AspectRatio) -> bool {
        if self.ratios.remove(&ratio) {
            false
        } else {
            self.ratios.insert(ratio);
            true
        }
    }

    pub fn contains(&self, ratio: AspectRatio) -> bool {
        self.ratios.contains(&ratio)
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn clear(&mut self) {
        self.ratios.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = AspectRatio> + '_ {
        self.ratios.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<AspectRatio> {
        self.iter().collect()
    }
}

impl FromIterator<AspectRatio> for AspectRatioSelection {
    fn from_iter<I: IntoIterator<Item = AspectRatio>>(iter: I) -> Self {
        Self {
            ratios: iter.into_iter().collect(),
        }
    }
}
