use indexmap::IndexMap;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::program::DecodeError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseLibraryEntry {
    pub name: String,
    pub samples: Vec<Complex64>,
}

/// The named-waveform library as it arrives on the wire: either a mapping from name to samples,
/// or a list of named entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PulseLibrary {
    Named(IndexMap<String, Vec<Complex64>>),
    Listed(Vec<PulseLibraryEntry>),
}

impl Default for PulseLibrary {
    fn default() -> Self {
        Self::Named(IndexMap::new())
    }
}

impl PulseLibrary {
    /// Reconcile either representation into a single name → samples mapping.
    ///
    /// A listed library naming the same waveform twice is rejected: there is no way to tell which
    /// entry an instruction refers to.
    pub fn normalize(&self) -> Result<WaveformLibrary, DecodeError> {
        match self {
            Self::Named(entries) => Ok(WaveformLibrary {
                waveforms: entries.clone(),
            }),
            Self::Listed(entries) => {
                let mut waveforms = IndexMap::with_capacity(entries.len());
                for entry in entries {
                    if waveforms
                        .insert(entry.name.clone(), entry.samples.clone())
                        .is_some()
                    {
                        return Err(DecodeError::DuplicateWaveform {
                            name: entry.name.clone(),
                        });
                    }
                }
                Ok(WaveformLibrary { waveforms })
            }
        }
    }
}

/// Precomputed waveforms addressable by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WaveformLibrary {
    waveforms: IndexMap<String, Vec<Complex64>>,
}

impl WaveformLibrary {
    pub fn get(&self, name: &str) -> Option<&[Complex64]> {
        self.waveforms.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.waveforms.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.waveforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }
}

impl FromIterator<(String, Vec<Complex64>)> for WaveformLibrary {
    fn from_iter<T: IntoIterator<Item = (String, Vec<Complex64>)>>(iter: T) -> Self {
        Self {
            waveforms: iter.into_iter().collect(),
        }
    }
}
