use std::collections::VecDeque;

use rand::RngCore;
use rand::seq::SliceRandom;
use serde::Serialize;

use aura_core::track::{Track, TrackInfo};

/// Result of a bulk enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Enqueued {
    pub accepted: usize,
    pub rejected: usize,
}

/// First titles of the queue plus its total length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub titles: Vec<String>,
    pub total: usize,
}

impl QueueSnapshot {
    /// How many queued tracks the listing leaves out.
    pub fn remaining(&self) -> usize {
        self.total - self.titles.len()
    }
}

/// Per-guild FIFO of tracks waiting to play.
#[derive(Debug)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
    next_seq: u64,
    max_len: usize,
}

impl TrackQueue {
    pub fn new(max_len: usize) -> Self {
        Self {
            tracks: VecDeque::new(),
            next_seq: 0,
            max_len,
        }
    }

    /// Append one track. Returns false when the queue is full.
    pub fn enqueue(&mut self, info: TrackInfo) -> bool {
        if self.tracks.len() >= self.max_len {
            return false;
        }
        self.tracks.push_back(Track {
            seq: self.next_seq,
            title: info.title,
            source: info.source,
        });
        self.next_seq += 1;
        true
    }

    /// Append tracks in order until the queue is full.
    pub fn enqueue_all(&mut self, infos: impl IntoIterator<Item = TrackInfo>) -> Enqueued {
        let mut result = Enqueued {
            accepted: 0,
            rejected: 0,
        };
        for info in infos {
            if self.enqueue(info) {
                result.accepted += 1;
            } else {
                result.rejected += 1;
            }
        }
        result
    }

    pub fn dequeue_next(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Randomly permute the waiting tracks. Returns false, leaving the queue
    /// alone, when there are fewer than two.
    pub fn shuffle(&mut self, rng: &mut dyn RngCore) -> bool {
        if self.tracks.len() < 2 {
            return false;
        }
        self.tracks.make_contiguous().shuffle(rng);
        true
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn snapshot(&self, limit: usize) -> QueueSnapshot {
        QueueSnapshot {
            titles: self
                .tracks
                .iter()
                .take(limit)
                .map(|t| t.title.clone())
                .collect(),
            total: self.tracks.len(),
        }
    }
}
