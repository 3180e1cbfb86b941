//! A Schedule represents the registered instructions of every channel laid out in time, with the
//! idle gap before each instruction.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::instruction::Label;
use crate::program::ChannelId;
use crate::units::Picoseconds;

use super::graph::{ScheduleGraph, ScheduledGraphNode};

/// Represents a span of time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    /// The inclusive start time of the described item
    start_time: Picoseconds,

    /// The described item's continuous duration
    duration: Picoseconds,
}

impl TimeSpan {
    pub fn new(start_time: Picoseconds, duration: Picoseconds) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    pub fn start_time(&self) -> Picoseconds {
        self.start_time
    }

    pub fn duration(&self) -> Picoseconds {
        self.duration
    }

    /// The exclusive end time of the described item
    pub fn end(&self) -> Picoseconds {
        self.start_time + self.duration
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_time, self.end())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Registration position of the instruction on its channel
    pub position: usize,
    pub label: Label,
    pub name: String,
    pub time_span: TimeSpan,
}

/// The instructions of one channel in time order; ties keep registration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSchedule {
    pub(super) channel: ChannelId,
    pub(super) entries: Vec<ScheduleEntry>,
}

impl ChannelSchedule {
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// The end of the last instruction on the channel.
    pub fn end(&self) -> Picoseconds {
        self.entries
            .iter()
            .map(|entry| entry.time_span.end())
            .max()
            .unwrap_or_default()
    }
}

/// One row of the cross-channel timing table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub channel: ChannelId,
    pub position: usize,
    pub label: Label,
    pub name: String,
    pub start: Picoseconds,
    pub duration: Picoseconds,
    /// Idle time since the previous instruction on the same channel
    pub gap: Picoseconds,
}

#[derive(Debug)]
pub struct Schedule {
    channels: Vec<ChannelSchedule>,
    graph: ScheduleGraph,
    manifest: OnceCell<Vec<ManifestEntry>>,
}

impl Schedule {
    pub(super) fn new(channels: Vec<ChannelSchedule>, graph: ScheduleGraph) -> Self {
        Self {
            channels,
            graph,
            manifest: OnceCell::new(),
        }
    }

    pub fn channels(&self) -> &[ChannelSchedule] {
        &self.channels
    }

    pub fn channel(&self, channel: &ChannelId) -> Option<&ChannelSchedule> {
        self.channels.iter().find(|schedule| &schedule.channel == channel)
    }

    pub fn graph(&self) -> &ScheduleGraph {
        &self.graph
    }

    /// The gap before the instruction at `position` on `channel`; zero for the first instruction.
    pub fn gap_before(&self, channel: &ChannelId, position: usize) -> Option<Picoseconds> {
        let channel_index = self
            .channels
            .iter()
            .position(|schedule| &schedule.channel == channel)?;
        let node = ScheduledGraphNode::new(channel_index, position);
        self.channels[channel_index]
            .entries
            .iter()
            .any(|entry| entry.position == position)
            .then(|| {
                self.graph
                    .predecessor(node)
                    .map_or(Picoseconds::ZERO, |(_, gap)| gap)
            })
    }

    /// The end time of the latest instruction over all channels.
    pub fn total_duration(&self) -> Picoseconds {
        self.channels
            .iter()
            .map(ChannelSchedule::end)
            .max()
            .unwrap_or_default()
    }

    /// Every scheduled instruction ordered by absolute start time, ties by channel then position.
    ///
    /// Computed on first use and cached.
    pub fn manifest(&self) -> &[ManifestEntry] {
        self.manifest.get_or_init(|| {
            let mut manifest: Vec<(usize, ManifestEntry)> = self
                .channels
                .iter()
                .enumerate()
                .flat_map(|(channel_index, schedule)| {
                    schedule.entries.iter().map(move |entry| {
                        let node = ScheduledGraphNode::new(channel_index, entry.position);
                        let gap = self
                            .graph
                            .predecessor(node)
                            .map_or(Picoseconds::ZERO, |(_, gap)| gap);
                        (
                            channel_index,
                            ManifestEntry {
                                channel: schedule.channel.clone(),
                                position: entry.position,
                                label: entry.label,
                                name: entry.name.clone(),
                                start: entry.time_span.start_time(),
                                duration: entry.time_span.duration(),
                                gap,
                            },
                        )
                    })
                })
                .collect();
            manifest.sort_by_key(|(channel_index, entry)| {
                (entry.start, *channel_index, entry.position)
            });
            manifest.into_iter().map(|(_, entry)| entry).collect()
        })
    }
}
