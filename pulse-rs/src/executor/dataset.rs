use indexmap::IndexMap;
use itertools::Itertools;
use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::job::ReturnMode;
use crate::program::AcquisitionSlot;

/// Measurement results of one acquisition channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    /// One value per (repetition, acquisition index)
    Single(Array2<Complex64>),
    /// One value per acquisition index, averaged over repetitions
    Averaged(Array1<Complex64>),
    /// Acquired traces, indexed `[repetition][acquisition index][sample]`; averaged traces have a
    /// single repetition
    Traces(Array3<Complex64>),
}

impl ChannelData {
    /// Number of acquisitions recorded per repetition.
    pub fn acquisitions(&self) -> usize {
        match self {
            Self::Single(data) => data.ncols(),
            Self::Averaged(data) => data.len(),
            Self::Traces(data) => data.dim().1,
        }
    }

    pub fn repetitions(&self) -> usize {
        match self {
            Self::Single(data) => data.nrows(),
            Self::Averaged(_) => 1,
            Self::Traces(data) => data.dim().0,
        }
    }

    /// Number of samples recorded per acquisition: 1 unless this holds traces.
    pub fn samples(&self) -> usize {
        match self {
            Self::Single(_) | Self::Averaged(_) => 1,
            Self::Traces(data) => data.dim().2,
        }
    }
}

impl Serialize for ChannelData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(data) => serializer.collect_seq(data.rows().into_iter().map(|row| row.to_vec())),
            Self::Averaged(data) => serializer.collect_seq(data.iter()),
            Self::Traces(data) => serializer.collect_seq(data.outer_iter().map(|repetition| {
                repetition
                    .outer_iter()
                    .map(|trace| trace.to_vec())
                    .collect::<Vec<_>>()
            })),
        }
    }
}

/// Results keyed by acquisition channel index, rendered as a string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    channels: IndexMap<String, ChannelData>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape raw backend memory into per-channel complex data.
    ///
    /// `memory` has one row per repetition (a single row when averaged), `samples` consecutive
    /// columns per entry of `slots`, and a trailing axis holding the real and imaginary parts.
    /// With more than one sample per acquisition the channels hold [`ChannelData::Traces`].
    /// Returns `None` if the memory doesn't have that shape.
    pub fn from_raw_memory(
        memory: &Array3<f64>,
        slots: &[AcquisitionSlot],
        return_mode: ReturnMode,
        samples: usize,
    ) -> Option<Self> {
        let (rows, columns, parts) = memory.dim();
        if samples == 0 || columns != slots.len() * samples || parts != 2 {
            return None;
        }
        if return_mode == ReturnMode::Avg && rows != 1 {
            return None;
        }

        let complex = memory
            .lanes(Axis(2))
            .into_iter()
            .map(|pair| Complex64::new(pair[0], pair[1]))
            .collect::<Array1<Complex64>>()
            .into_shape((rows, columns))
            .ok()?;

        let mut dataset = Self::new();
        let groups = slots
            .iter()
            .enumerate()
            .group_by(|(_, slot)| slot.acq_channel);
        for (acq_channel, group) in &groups {
            let columns: Vec<usize> = group
                .flat_map(|(index, _)| index * samples..(index + 1) * samples)
                .collect();
            let block = complex.select(Axis(1), &columns);
            let data = match (return_mode, samples) {
                (ReturnMode::Single, 1) => ChannelData::Single(block),
                (ReturnMode::Avg, 1) => ChannelData::Averaged(block.row(0).to_owned()),
                _ => {
                    let acquisitions = block.ncols() / samples;
                    let traces = Array3::from_shape_vec(
                        (rows, acquisitions, samples),
                        block.iter().copied().collect(),
                    )
                    .ok()?;
                    ChannelData::Traces(traces)
                }
            };
            dataset.insert(acq_channel, data);
        }
        Some(dataset)
    }

    pub fn insert(&mut self, acq_channel: u32, data: ChannelData) {
        self.channels.insert(acq_channel.to_string(), data);
    }

    pub fn get(&self, acq_channel: u32) -> Option<&ChannelData> {
        self.channels.get(&acq_channel.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelData)> {
        self.channels.iter().map(|(key, data)| (key.as_str(), data))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (channel, data) in &self.channels {
            map.serialize_entry(channel, data)?;
        }
        map.end()
    }
}
