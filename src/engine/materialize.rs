//! Staggered room materialization.
//!
//! The topology is generated up front; this scheduler walks the creation order
//! and materializes rooms in batches, one batch per `batch_delay` seconds.
//! Cancelling leaves the rooms built so far in place.

use crate::config::MaterializeConfig;
use crate::events::EventQueue;

use super::dungeon::Dungeon;

#[derive(Debug, Clone)]
pub struct MaterializeScheduler {
    batch_size: usize,
    batch_delay: f32,
    /// Seconds until the next batch.
    timer: f32,
    /// Generation epoch this scheduler belongs to.
    epoch: u64,
    cancelled: bool,
}

impl MaterializeScheduler {
    /// The first batch is due immediately.
    pub fn new(config: &MaterializeConfig, epoch: u64) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay.max(0.0),
            timer: 0.0,
            epoch,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Nothing is left to do: cancelled, done, or the dungeon was regenerated.
    pub fn is_finished(&self, dungeon: &Dungeon) -> bool {
        self.cancelled || dungeon.epoch() != self.epoch || dungeon.is_fully_materialized()
    }

    /// Advance by `dt` seconds. Returns the number of rooms materialized.
    pub fn advance(&mut self, dt: f32, dungeon: &mut Dungeon, events: &mut EventQueue) -> usize {
        if self.is_finished(dungeon) {
            return 0;
        }
        self.timer -= dt.max(0.0);
        let mut built = 0;
        while self.timer <= 0.0 && !self.is_finished(dungeon) {
            built += dungeon.materialize_next(self.batch_size, events);
            if self.batch_delay <= 0.0 {
                continue;
            }
            self.timer += self.batch_delay;
        }
        if built > 0 {
            log::debug!(
                "Materialized {built} rooms ({}/{})",
                dungeon.materialized_count(),
                dungeon.room_count()
            );
        }
        built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DungeonConfig;

    fn dungeon(rooms: usize, batch_size: usize, batch_delay: f32) -> (Dungeon, MaterializeScheduler) {
        let mut config = DungeonConfig::default();
        config.materialize.batch_size = batch_size;
        config.materialize.batch_delay = batch_delay;
        let mut dungeon = Dungeon::new(config);
        let scheduler = dungeon.generate_cinematic(Some(3), rooms, 3);
        (dungeon, scheduler)
    }

    #[test]
    fn test_batches_follow_delay() {
        let (mut dungeon, mut scheduler) = dungeon(7, 3, 0.5);
        let mut events = EventQueue::new();
        assert_eq!(scheduler.advance(0.0, &mut dungeon, &mut events), 3);
        assert_eq!(scheduler.advance(0.25, &mut dungeon, &mut events), 0);
        assert_eq!(scheduler.advance(0.25, &mut dungeon, &mut events), 3);
        assert_eq!(scheduler.advance(0.5, &mut dungeon, &mut events), 1);
        assert!(scheduler.is_finished(&dungeon));
        assert_eq!(scheduler.advance(10.0, &mut dungeon, &mut events), 0);
    }

    #[test]
    fn test_long_tick_catches_up() {
        let (mut dungeon, mut scheduler) = dungeon(7, 2, 0.5);
        let mut events = EventQueue::new();
        assert_eq!(scheduler.advance(1.0, &mut dungeon, &mut events), 6);
        assert_eq!(dungeon.materialized_count(), 6);
    }

    #[test]
    fn test_zero_delay_builds_everything() {
        let (mut dungeon, mut scheduler) = dungeon(9, 2, 0.0);
        let mut events = EventQueue::new();
        assert_eq!(scheduler.advance(0.0, &mut dungeon, &mut events), 9);
        assert!(dungeon.is_fully_materialized());
    }

    #[test]
    fn test_cancel_keeps_built_rooms() {
        let (mut dungeon, mut scheduler) = dungeon(7, 3, 0.5);
        let mut events = EventQueue::new();
        scheduler.advance(0.0, &mut dungeon, &mut events);
        scheduler.cancel();
        assert_eq!(scheduler.advance(5.0, &mut dungeon, &mut events), 0);
        assert_eq!(dungeon.materialized_count(), 3);
        assert!(dungeon.get_room_controller(2).is_some());
    }

    #[test]
    fn test_regeneration_stops_stale_scheduler() {
        let (mut dungeon, mut scheduler) = dungeon(7, 3, 0.5);
        let mut events = EventQueue::new();
        dungeon.generate(Some(4), 5, 3, &mut events);
        assert!(scheduler.is_finished(&dungeon));
        assert_eq!(scheduler.advance(1.0, &mut dungeon, &mut events), 0);
    }
}
