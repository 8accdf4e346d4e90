//! Persistence of the finished keypoint sequence.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::pipeline::KeypointSequence;

/// Writes the full `(frames, 17, 3)` keypoint array in one call at run end.
pub trait KeypointSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn save(&mut self, sequence: &KeypointSequence) -> Result<(), Self::Error>;
}

impl<K: KeypointSink + ?Sized> KeypointSink for &mut K {
    type Error = K::Error;

    fn save(&mut self, sequence: &KeypointSequence) -> Result<(), Self::Error> {
        (**self).save(sequence)
    }
}

/// Saves the sequence as a NumPy `.npy` file, creating parent directories.
#[derive(Debug, Clone)]
pub struct NpyFileSink {
    path: PathBuf,
}

impl NpyFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeypointSink for NpyFileSink {
    type Error = PipelineError;

    fn save(&mut self, sequence: &KeypointSequence) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        sequence.save_npy(&self.path)
    }
}

/// Keeps a copy of the last saved sequence in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub saved: Option<KeypointSequence>,
}

impl KeypointSink for MemorySink {
    type Error = Infallible;

    fn save(&mut self, sequence: &KeypointSequence) -> Result<(), Self::Error> {
        self.saved = Some(sequence.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::KeypointFrame;

    #[test]
    fn test_npy_sink_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/keypoints.npy");

        let mut sequence = KeypointSequence::new();
        sequence.push(KeypointFrame::zeroed());
        sequence.push(KeypointFrame::zeroed());

        let mut sink = NpyFileSink::new(&path);
        sink.save(&sequence).unwrap();

        let loaded = KeypointSequence::load_npy(&path).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::default();
        sink.save(&KeypointSequence::new()).unwrap();
        assert_eq!(sink.saved.map(|s| s.len()), Some(0));
    }
}
