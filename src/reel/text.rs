use std::collections::BTreeSet;
use std::path::Path;

use crate::foundation::core::Frame;
use crate::foundation::error::{DcpError, DcpResult};
use crate::foundation::time::{DcpTime, TimePeriod};

/// Whether a text track is burnt-in style subtitles or closed captions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextType {
    /// Open subtitles, one track per package.
    OpenSubtitle,
    /// Closed captions, any number of named tracks.
    ClosedCaption,
}

/// One timed text cue as handed over by the player.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerText {
    /// Lines of text, top to bottom.
    pub lines: Vec<String>,
    /// Ids of the fonts the cue uses.
    #[serde(default)]
    pub fonts: Vec<String>,
}

impl PlayerText {
    /// Cue of plain lines with no particular font.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            fonts: Vec::new(),
        }
    }
}

/// Font file handed over alongside the text that uses it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontData {
    /// Id that text cues refer to.
    pub id: String,
    /// Font file bytes.
    pub data: Vec<u8>,
}

/// A cue parked until its reel becomes current.
#[derive(Clone, Debug, PartialEq)]
pub struct HangingText {
    /// Cue.
    pub text: PlayerText,
    /// Track type.
    pub kind: TextType,
    /// Caption track, for closed captions.
    pub track: Option<String>,
    /// Timeline period, already clipped to the reel it belongs to.
    pub period: TimePeriod,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct TextEntry {
    /// Start and end in picture frames relative to the reel start.
    in_frame: Frame,
    out_frame: Frame,
    text: PlayerText,
}

#[derive(Debug, serde::Serialize)]
struct TextDocument<'a> {
    id: uuid::Uuid,
    kind: TextType,
    track: Option<&'a str>,
    edit_rate: f64,
    entries: &'a [TextEntry],
    fonts: &'a BTreeSet<String>,
}

/// Collects the cues of one text track of one reel.
#[derive(Debug)]
pub struct TextAssetWriter {
    id: uuid::Uuid,
    kind: TextType,
    track: Option<String>,
    reel_start: DcpTime,
    fps: f64,
    entries: Vec<TextEntry>,
    fonts: BTreeSet<String>,
}

impl TextAssetWriter {
    /// Empty track for the reel starting at `reel_start`.
    pub fn new(kind: TextType, track: Option<String>, reel_start: DcpTime, fps: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind,
            track,
            reel_start,
            fps,
            entries: Vec::new(),
            fonts: BTreeSet::new(),
        }
    }

    /// Asset identity.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Caption track name.
    pub fn track(&self) -> Option<&str> {
        self.track.as_deref()
    }

    /// Font ids referenced by the cues so far.
    pub fn fonts(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(String::as_str)
    }

    /// Add a cue shown during `period` of the timeline.
    pub fn write(&mut self, text: PlayerText, period: TimePeriod) -> DcpResult<()> {
        if period.from < self.reel_start || period.to < period.from {
            return Err(DcpError::contract(format!(
                "text period {}..{} does not fit a reel starting at {}",
                period.from.get(),
                period.to.get(),
                self.reel_start.get()
            )));
        }
        self.fonts.extend(text.fonts.iter().cloned());
        self.entries.push(TextEntry {
            in_frame: (period.from - self.reel_start).frames_round(self.fps),
            out_frame: (period.to - self.reel_start).frames_round(self.fps),
            text,
        });
        Ok(())
    }

    /// Write the track as JSON to `path`.
    pub fn finalize(&self, path: &Path) -> DcpResult<()> {
        let doc = TextDocument {
            id: self.id,
            kind: self.kind,
            track: self.track.as_deref(),
            edit_rate: self.fps,
            entries: &self.entries,
            fonts: &self.fonts,
        };
        let json =
            serde_json::to_vec_pretty(&doc).map_err(|e| DcpError::serde(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| DcpError::io(path, "write text asset", e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reel/text.rs"]
mod tests;
