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
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

mod audio;
mod error;
mod rhythm;
mod samples;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::rhythm::Rhythm;
pub use self::samples::{default_catalog, loop_region, LoopWindow, SampleDefinition};

/// The slots the original toy exposed.
pub const DEFAULT_SLOTS: [&str; 7] = [
    "char1", "char2", "char3", "char4", "char5", "char6", "char7",
];

fn default_slots() -> Vec<String> {
    DEFAULT_SLOTS.iter().map(|slot| slot.to_string()).collect()
}

/// The top level mixer configuration.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Mixer {
    /// The audio output.
    #[serde(default)]
    audio: Audio,

    /// The rhythmic grid.
    #[serde(default)]
    rhythm: Rhythm,

    /// Slot IDs, in display order.
    #[serde(default = "default_slots")]
    slots: Vec<String>,

    /// The sample catalog.
    #[serde(default = "default_catalog")]
    samples: Vec<SampleDefinition>,
}

impl Default for Mixer {
    fn default() -> Self {
        Mixer {
            audio: Audio::default(),
            rhythm: Rhythm::default(),
            slots: default_slots(),
            samples: default_catalog(),
        }
    }
}

impl Mixer {
    /// Creates a new mixer configuration.
    pub fn new(
        audio: Audio,
        rhythm: Rhythm,
        slots: Vec<String>,
        samples: Vec<SampleDefinition>,
    ) -> Mixer {
        Mixer {
            audio,
            rhythm,
            slots,
            samples,
        }
    }

    /// Parses a mixer configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Mixer, ConfigError> {
        let mixer = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Mixer>()?;
        mixer.validate()?;
        Ok(mixer)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn rhythm(&self) -> &Rhythm {
        &self.rhythm
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn samples(&self) -> &[SampleDefinition] {
        &self.samples
    }

    /// Checks the configuration for values the mixer can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rhythm.validate()?;

        if self.slots.is_empty() {
            return Err(ConfigError::Invalid("at least one slot is required".into()));
        }
        let mut slots = HashSet::new();
        for slot in &self.slots {
            if !slots.insert(slot.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate slot {}", slot)));
            }
        }

        let mut ids = HashSet::new();
        for sample in &self.samples {
            if !ids.insert(sample.id()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sample {}",
                    sample.id()
                )));
            }
            if let Some(window) = sample.loop_window() {
                if !window.start.is_finite() || !window.end.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "sample {} has a non-finite loop window",
                        sample.id()
                    )));
                }
            }
            if !(0.0..=1.0).contains(&sample.volume()) {
                return Err(ConfigError::Invalid(format!(
                    "sample {} volume must be between 0 and 1, got {}",
                    sample.id(),
                    sample.volume()
                )));
            }
        }
        Ok(())
    }
}

/// Loads the mixer configuration. Without a path the built-in defaults are used and sample files
/// resolve against the working directory. Returns the configuration and the base path for
/// sample files.
pub fn load(path: Option<&Path>) -> Result<(Mixer, PathBuf), ConfigError> {
    match path {
        Some(path) => {
            let mixer = Mixer::deserialize(path)?;
            let base_path = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((mixer, base_path))
        }
        None => Ok((Mixer::default(), PathBuf::from("."))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_load_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loopmix.yaml");
        fs::write(
            &path,
            r#"
audio:
  device: mock-device
  sample_rate: 48000
rhythm:
  cycle_duration_ms: 4000
  beats_per_cycle: 4
  alignment_lead_seconds: 0.1
slots:
  - left
  - right
samples:
  - id: kick
    label: KICK
    file: kick.wav
    loop_window:
      start: 0.0
      end: 4.0
    volume: 0.5
  - id: ghost
"#,
        )
        .unwrap();

        let (mixer, base_path) = load(Some(&path)).unwrap();
        assert_eq!(base_path, dir.path());
        assert_eq!(mixer.audio().device(), "mock-device");
        assert_eq!(mixer.audio().sample_rate(), Some(48000));
        assert_eq!(mixer.rhythm().cycle_duration(), Duration::from_secs(4));
        assert_eq!(mixer.rhythm().beats_per_cycle(), 4);
        assert_eq!(mixer.slots(), &["left".to_string(), "right".to_string()]);
        assert_eq!(mixer.samples().len(), 2);
        assert_eq!(mixer.samples()[0].volume(), 0.5);
        assert_eq!(mixer.samples()[1].file(), None);
    }

    #[test]
    fn test_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loopmix.yaml");
        fs::write(&path, "audio:\n  device: mock\n").unwrap();

        let (mixer, _) = load(Some(&path)).unwrap();
        assert_eq!(mixer.rhythm(), &Rhythm::default());
        assert_eq!(mixer.slots().len(), 7);
        assert_eq!(mixer.samples(), default_catalog().as_slice());
        assert_eq!(mixer.audio().sample_rate(), None);
    }

    #[test]
    fn test_load_without_path() {
        let (mixer, base_path) = load(None).unwrap();
        assert_eq!(mixer, Mixer::default());
        assert_eq!(base_path, PathBuf::from("."));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(Some(&dir.path().join("nope.yaml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_invalid_rhythm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loopmix.yaml");
        fs::write(&path, "rhythm:\n  beats_per_cycle: 0\n").unwrap();
        assert!(matches!(load(Some(&path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_duplicates() {
        let duplicate_samples = Mixer::new(
            Audio::default(),
            Rhythm::default(),
            default_slots(),
            vec![
                SampleDefinition::new("a", None, None, None),
                SampleDefinition::new("a", None, None, None),
            ],
        );
        assert!(duplicate_samples.validate().is_err());

        let duplicate_slots = Mixer::new(
            Audio::default(),
            Rhythm::default(),
            vec!["a".into(), "a".into()],
            vec![],
        );
        assert!(duplicate_slots.validate().is_err());
    }

    #[test]
    fn test_validate_volume() {
        let loud = Mixer::new(
            Audio::default(),
            Rhythm::default(),
            default_slots(),
            vec![SampleDefinition::new("a", None, None, None).with_volume(1.5)],
        );
        assert!(loud.validate().is_err());
    }
}
