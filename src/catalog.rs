use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::audio::AudioAsset;

/// 1-based index into the catalog, as carried by the `meditate/<id>` route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl SessionId {
    /// Zero-based catalog position, `None` for the invalid id 0.
    pub fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(SessionId)
            .map_err(|_| anyhow!("`{s}` is not a meditation id"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeditationEntry {
    pub id: SessionId,
    pub title: &'static str,
    pub audio: &'static str,
    pub image: &'static str,
}

pub trait Catalog: Send + Sync {
    fn entries(&self) -> &[MeditationEntry];

    fn entry(&self, id: SessionId) -> Option<&MeditationEntry> {
        id.index().and_then(|index| self.entries().get(index))
    }

    /// Resolves an entry's audio name to something the audio engine can load.
    fn audio_asset(&self, name: &str) -> Option<AudioAsset>;
}

static MEDITATION_DATA: [MeditationEntry; 6] = [
    MeditationEntry {
        id: SessionId(1),
        title: "Mountains",
        audio: "brown-noise",
        image: "trees.webp",
    },
    MeditationEntry {
        id: SessionId(2),
        title: "Rainforest",
        audio: "rain",
        image: "river.webp",
    },
    MeditationEntry {
        id: SessionId(3),
        title: "Sunset",
        audio: "binaural-alpha",
        image: "meditate-under-tree.webp",
    },
    MeditationEntry {
        id: SessionId(4),
        title: "Beach",
        audio: "brown-noise",
        image: "beach.webp",
    },
    MeditationEntry {
        id: SessionId(5),
        title: "Starry Night",
        audio: "binaural-theta",
        image: "yosemite-stars.webp",
    },
    MeditationEntry {
        id: SessionId(6),
        title: "Waterfall",
        audio: "rain",
        image: "waterfall.webp",
    },
];

fn bundled_audio(name: &str) -> Option<AudioAsset> {
    match name {
        "brown-noise" => Some(AudioAsset::BrownNoise),
        "rain" => Some(AudioAsset::Rain),
        "binaural-alpha" => Some(AudioAsset::Binaural {
            left_hz: 200.0,
            right_hz: 210.0,
        }),
        "binaural-theta" => Some(AudioAsset::Binaural {
            left_hz: 200.0,
            right_hz: 206.0,
        }),
        _ => None,
    }
}

/// The sessions that ship with the app. Audio names can be rebound to files
/// on disk through the `audioOverrides` setting.
#[derive(Debug, Clone, Default)]
pub struct BundledCatalog {
    overrides: HashMap<String, PathBuf>,
}

impl BundledCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: HashMap<String, PathBuf>) -> Self {
        Self { overrides }
    }
}

impl Catalog for BundledCatalog {
    fn entries(&self) -> &[MeditationEntry] {
        &MEDITATION_DATA
    }

    fn audio_asset(&self, name: &str) -> Option<AudioAsset> {
        match self.overrides.get(name) {
            Some(path) => Some(AudioAsset::File { path: path.clone() }),
            None => bundled_audio(name),
        }
    }
}
