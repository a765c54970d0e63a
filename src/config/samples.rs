// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use serde::{Deserialize, Serialize};

use crate::audio::{DecodedAudio, LoopRegion};

/// Volume used when a sample doesn't set one.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// A YAML representation of a catalog entry.
#[derive(Deserialize, Clone, Serialize, Debug, PartialEq)]
pub struct SampleDefinition {
    /// The sample ID used by assign.
    id: String,

    /// What the display layer shows for this sample (e.g. DRUM).
    label: Option<String>,

    /// The encoded audio file. Relative paths are resolved against the config file's directory.
    /// A sample without a file is listed but can never be played.
    file: Option<String>,

    /// The repeating region. Defaults to the whole buffer.
    loop_window: Option<LoopWindow>,

    /// Initial voice gain, 0.0 to 1.0.
    #[serde(default = "default_volume")]
    volume: f32,
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

impl SampleDefinition {
    /// Creates a new sample definition.
    pub fn new(
        id: &str,
        label: Option<&str>,
        file: Option<&str>,
        loop_window: Option<LoopWindow>,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.map(str::to_string),
            file: file.map(str::to_string),
            loop_window,
            volume: DEFAULT_VOLUME,
        }
    }

    /// Returns a copy with the given volume.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The display label, falling back to the ID.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn loop_window(&self) -> Option<LoopWindow> {
        self.loop_window
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// Loop trim points in seconds. These are tuned by ear per recording.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq)]
pub struct LoopWindow {
    pub start: f64,
    pub end: f64,
}

impl LoopWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Converts the window to frames of the given audio. Both bounds are clamped to the buffer;
    /// a window that ends up empty or inverted selects the whole buffer.
    pub fn resolve(&self, audio: &DecodedAudio) -> LoopRegion {
        let frames = audio.frames();
        let rate = audio.sample_rate() as f64;
        let to_frame = |seconds: f64| -> usize {
            if !seconds.is_finite() || seconds <= 0.0 {
                0
            } else {
                ((seconds * rate).round() as usize).min(frames)
            }
        };

        let region = LoopRegion {
            start: to_frame(self.start),
            end: to_frame(self.end),
        };
        if region.is_empty() {
            LoopRegion::full(audio)
        } else {
            region
        }
    }
}

/// Resolves an optional window; no window means the whole buffer.
pub fn loop_region(window: Option<LoopWindow>, audio: &DecodedAudio) -> LoopRegion {
    match window {
        Some(window) => window.resolve(audio),
        None => LoopRegion::full(audio),
    }
}

/// The catalog the original toy shipped with. The drum and synth trims were tuned by ear.
pub fn default_catalog() -> Vec<SampleDefinition> {
    vec![
        SampleDefinition::new(
            "sound1",
            Some("DRUM"),
            Some("sounds/drum_3.wav"),
            Some(LoopWindow::new(0.5, 8.5)),
        ),
        SampleDefinition::new("sound2", Some("PIANO"), Some("sounds/piano_1.wav"), None),
        SampleDefinition::new(
            "sound3",
            Some("SYNTH"),
            Some("sounds/synth_1.wav"),
            Some(LoopWindow::new(-0.2, 7.8)),
        ),
        SampleDefinition::new("sound4", Some("TRUMPET"), None, None),
    ]
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    fn ten_seconds_at_100hz() -> DecodedAudio {
        DecodedAudio::new(vec![0.0; 1000], 1, 100)
    }

    #[test]
    fn test_resolve_window() {
        let audio = ten_seconds_at_100hz();
        assert_eq!(
            LoopWindow::new(0.5, 8.5).resolve(&audio),
            LoopRegion { start: 50, end: 850 }
        );
    }

    #[test]
    fn test_resolve_negative_start_clamps() {
        let audio = ten_seconds_at_100hz();
        assert_eq!(
            LoopWindow::new(-0.2, 7.8).resolve(&audio),
            LoopRegion { start: 0, end: 780 }
        );
    }

    #[test]
    fn test_resolve_past_end_clamps() {
        let audio = ten_seconds_at_100hz();
        assert_eq!(
            LoopWindow::new(2.0, 30.0).resolve(&audio),
            LoopRegion {
                start: 200,
                end: 1000
            }
        );
    }

    #[test]
    fn test_resolve_inverted_is_full() {
        let audio = ten_seconds_at_100hz();
        assert_eq!(
            LoopWindow::new(5.0, 1.0).resolve(&audio),
            LoopRegion::full(&audio)
        );
        assert_eq!(loop_region(None, &audio), LoopRegion::full(&audio));
    }

    #[test]
    fn test_sample_definition_deserialize() {
        let yaml = r#"
            id: sound1
            label: DRUM
            file: sounds/drum.wav
            loop_window:
              start: 0.5
              end: 8.5
        "#;

        let definition: SampleDefinition = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(definition.id(), "sound1");
        assert_eq!(definition.label(), "DRUM");
        assert_eq!(definition.file(), Some("sounds/drum.wav"));
        assert_eq!(definition.loop_window(), Some(LoopWindow::new(0.5, 8.5)));
        assert_eq!(definition.volume(), DEFAULT_VOLUME);
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let definition = SampleDefinition::new("bongo", None, None, None);
        assert_eq!(definition.label(), "bongo");
    }

    #[test]
    fn test_default_catalog() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog[0].loop_window(), Some(LoopWindow::new(0.5, 8.5)));
        assert_eq!(catalog[2].loop_window(), Some(LoopWindow::new(-0.2, 7.8)));
        assert_eq!(catalog[3].label(), "TRUMPET");
        assert_eq!(catalog[3].file(), None);
    }
}
