//! Priority-bucketed work queue for incremental recomputation.
//!
//! Five FIFO buckets plus an id -> priority map. Upgrading a queued piece
//! pushes it into the more urgent bucket and leaves a stale entry behind in
//! the old one; stale entries are skipped when popped.
//!
//! Normal, Low and Background are serviced on a decimated schedule. On ticks
//! their interval fires they get a reserved share of the batch before the
//! remainder is filled most-urgent-first, so sustained urgent load cannot
//! starve them. A bucket whose more urgent buckets are all empty is always
//! eligible, which lets idle ticks drain background debt.

use std::collections::{HashMap, VecDeque};

use buttress_core::config::{SchedulerConfig, ZoneConfig};
use buttress_core::constants::LOWER_BUCKET_SHARE_DIVISOR;
use buttress_core::types::PieceId;
use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Immediate,
    High,
    Normal,
    Low,
    Background,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Immediate,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Background,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    buckets: [VecDeque<PieceId>; 5],
    queued: HashMap<PieceId, Priority>,
    /// Live (non-stale) entries per bucket.
    live: [usize; 5],
    /// Buckets whose service interval fires this tick.
    due: [bool; 5],
    tick: u64,
    config: SchedulerConfig,
}

impl UpdateScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            buckets: Default::default(),
            queued: HashMap::new(),
            live: [0; 5],
            due: [true; 5],
            tick: 0,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn priority_of(&self, id: PieceId) -> Option<Priority> {
        self.queued.get(&id).copied()
    }

    pub fn queued_at(&self, priority: Priority) -> usize {
        self.live[priority.index()]
    }

    /// Queue `id`, or upgrade it if already queued less urgently.
    /// Never downgrades. Returns whether the queue changed.
    pub fn enqueue(&mut self, id: PieceId, priority: Priority) -> bool {
        if let Some(&current) = self.queued.get(&id) {
            if current <= priority {
                return false;
            }
            self.live[current.index()] -= 1;
        }
        self.queued.insert(id, priority);
        self.live[priority.index()] += 1;
        self.buckets[priority.index()].push_back(id);
        true
    }

    /// Put back an entry taken this tick, ahead of everything else in its bucket.
    pub fn requeue_front(&mut self, id: PieceId, priority: Priority) {
        if let Some(&current) = self.queued.get(&id) {
            if current <= priority {
                return;
            }
            self.live[current.index()] -= 1;
        }
        self.queued.insert(id, priority);
        self.live[priority.index()] += 1;
        self.buckets[priority.index()].push_front(id);
    }

    /// Drop a piece from the queue (it was removed from the graph).
    pub fn remove(&mut self, id: PieceId) -> bool {
        match self.queued.remove(&id) {
            Some(priority) => {
                self.live[priority.index()] -= 1;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.queued.clear();
        self.live = [0; 5];
    }

    /// Advance to the next tick and decide which decimated buckets are due.
    pub fn begin_tick(&mut self) {
        self.tick += 1;
        let fires = |interval: u64| self.tick % interval.max(1) == 0;
        self.due = [
            true,
            true,
            fires(self.config.normal_interval),
            fires(self.config.low_interval),
            fires(self.config.background_interval),
        ];
    }

    /// Take up to `max` entries for this tick.
    pub fn take_batch(&mut self, max: usize) -> Vec<(PieceId, Priority)> {
        let mut batch = Vec::with_capacity(max.min(self.queued.len()));

        let share = (max / LOWER_BUCKET_SHARE_DIVISOR).max(1);
        for priority in [Priority::Normal, Priority::Low, Priority::Background] {
            if self.due[priority.index()] {
                let room = share.min(max - batch.len());
                self.drain_into(priority, room, &mut batch);
            }
        }

        for (i, priority) in Priority::ALL.into_iter().enumerate() {
            if batch.len() >= max {
                break;
            }
            let idle_above = self.live[..i].iter().all(|&n| n == 0);
            if self.due[i] || idle_above {
                let room = max - batch.len();
                self.drain_into(priority, room, &mut batch);
            }
        }
        batch
    }

    fn drain_into(&mut self, priority: Priority, room: usize, out: &mut Vec<(PieceId, Priority)>) {
        let bucket = priority.index();
        let mut taken = 0;
        while taken < room {
            let Some(id) = self.buckets[bucket].pop_front() else {
                break;
            };
            if self.queued.get(&id) != Some(&priority) {
                continue;
            }
            self.queued.remove(&id);
            self.live[bucket] -= 1;
            out.push((id, priority));
            taken += 1;
        }
    }
}

/// Ground-plane cell gating for very large worlds.
///
/// Work for pieces outside `active_radius` cells (Chebyshev distance) of the
/// focus cell is deferred. With no focus set every piece is admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGate {
    cell_size: f32,
    active_radius: i32,
    focus: Option<IVec2>,
}

impl ZoneGate {
    pub fn new(config: &ZoneConfig) -> Self {
        Self {
            cell_size: config.cell_size,
            active_radius: config.active_radius,
            focus: None,
        }
    }

    pub fn cell_of(&self, position: Vec3) -> IVec2 {
        IVec2::new(
            (position.x / self.cell_size).floor() as i32,
            (position.z / self.cell_size).floor() as i32,
        )
    }

    pub fn set_focus(&mut self, focus: Option<Vec3>) {
        self.focus = focus.map(|p| self.cell_of(p));
    }

    pub fn focus_cell(&self) -> Option<IVec2> {
        self.focus
    }

    pub fn admits(&self, position: Vec3) -> bool {
        match self.focus {
            None => true,
            Some(focus) => {
                // Cells saturate at the i32 limits, so measure in i64.
                let cell = self.cell_of(position);
                let dx = (i64::from(cell.x) - i64::from(focus.x)).abs();
                let dy = (i64::from(cell.y) - i64::from(focus.y)).abs();
                dx.max(dy) <= i64::from(self.active_radius)
            }
        }
    }
}
