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

//! Sample resolution and caching.
//!
//! Samples are decoded on first use and kept in memory for the life of the process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::SampleError;
use crate::audio::{decode_bytes, DecodeError, DecodedAudio, LoopRegion};
use crate::config::{loop_region, SampleDefinition};

/// A decoded sample, ready to play. Clones share the audio buffer.
#[derive(Clone, Debug)]
pub struct Sample {
    id: String,
    audio: DecodedAudio,
    region: LoopRegion,
    volume: f32,
}

impl Sample {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The decoded audio, at the store's target sample rate.
    pub fn audio(&self) -> &DecodedAudio {
        &self.audio
    }

    /// The loop window resolved to frames.
    pub fn region(&self) -> LoopRegion {
        self.region
    }

    /// The configured initial gain.
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// Resolves catalog entries to decoded audio.
pub struct SampleStore {
    /// Catalog entries in configuration order.
    catalog: Vec<SampleDefinition>,
    /// Directory relative sample files are resolved against.
    base_path: PathBuf,
    /// Sample rate every cached buffer is converted to.
    target_sample_rate: u32,
    /// Decoded samples by ID. Never evicted.
    cache: HashMap<String, Sample>,
}

impl SampleStore {
    /// Creates a new sample store. Nothing is decoded until it's resolved.
    pub fn new(catalog: Vec<SampleDefinition>, base_path: &Path, target_sample_rate: u32) -> Self {
        Self {
            catalog,
            base_path: base_path.to_path_buf(),
            target_sample_rate,
            cache: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &[SampleDefinition] {
        &self.catalog
    }

    /// Looks up a catalog entry.
    pub fn definition(&self, id: &str) -> Option<&SampleDefinition> {
        self.catalog.iter().find(|definition| definition.id() == id)
    }

    /// Number of decoded samples held in memory.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Resolves a sample ID to decoded audio. The first call reads and decodes the file; later
    /// calls return the cached buffer. Failures are not cached.
    pub fn resolve(&mut self, id: &str) -> Result<Sample, SampleError> {
        if let Some(sample) = self.cache.get(id) {
            debug!(sample = id, "Using cached sample");
            return Ok(sample.clone());
        }

        let definition = self
            .definition(id)
            .ok_or_else(|| SampleError::Unknown(id.to_string()))?;
        let audio = self
            .load(definition)
            .map_err(|source| SampleError::Decode {
                id: id.to_string(),
                source,
            })?;

        let sample = Sample {
            id: id.to_string(),
            region: loop_region(definition.loop_window(), &audio),
            volume: definition.volume(),
            audio,
        };
        info!(
            sample = id,
            duration = ?sample.audio.duration(),
            loop_start = sample.region.start,
            loop_end = sample.region.end,
            memory_bytes = sample.audio.memory_size(),
            "Sample loaded into memory"
        );

        self.cache.insert(id.to_string(), sample.clone());
        Ok(sample)
    }

    fn load(&self, definition: &SampleDefinition) -> Result<DecodedAudio, DecodeError> {
        let file = definition.file().ok_or(DecodeError::NoSource)?;
        let path = self.base_path.join(file);
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_string);

        info!(sample = definition.id(), path = ?path, "Loading sample");
        let audio = decode_bytes(fs::read(&path)?, extension.as_deref())?;
        Ok(audio.to_sample_rate(self.target_sample_rate))
    }
}
