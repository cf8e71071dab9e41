//! Game engine - owns the dungeon and the run, and provides a clean API to outside collaborators.
//!
//! The engine handles:
//! - Dungeon generation (eager or staggered)
//! - Routing external notifications (room entered, doorway passed, deaths)
//! - Dispatching queued events to the run controller
//!
//! Collaborators (player controller, UI, audio) only:
//! - Forward what happened to the engine
//! - Present the events the engine returns

mod dungeon;
mod materialize;
mod progression;

pub use dungeon::Dungeon;
pub use materialize::MaterializeScheduler;
pub use progression::{RunController, RunState};

use crate::config::DungeonConfig;
use crate::direction::Direction;
use crate::door::{AimProbe, DoorLink};
use crate::events::{DungeonEvent, EventQueue};

use glam::Vec3;
use hecs::Entity;

/// Result of a tick - everything that happened since the last one
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events in the order they were dispatched
    pub events: Vec<DungeonEvent>,
    /// Rooms materialized during this tick
    pub materialized: usize,
}

/// The game engine - owns the dungeon context and the run state machine.
pub struct GameEngine {
    pub dungeon: Dungeon,
    pub run: RunController,

    /// Events raised but not yet dispatched
    events: EventQueue,

    /// Dispatched events waiting to be handed out by `tick`
    outbox: Vec<DungeonEvent>,

    /// Staggered materialization in progress, if any
    scheduler: Option<MaterializeScheduler>,

    /// Last known agent position
    agent: Vec3,
}

impl GameEngine {
    /// Generate a dungeon from `config` and wait in PreGame at the entry room.
    pub fn new(config: DungeonConfig) -> Self {
        let mut engine = Self::empty(config);
        engine.dungeon.generate_from_config(&mut engine.events);
        engine.finish_setup();
        engine
    }

    /// Like [`GameEngine::new`], but rooms materialize over the following ticks.
    pub fn new_cinematic(config: DungeonConfig) -> Self {
        let mut engine = Self::empty(config);
        engine.start_cinematic();
        engine.finish_setup();
        engine
    }

    fn empty(config: DungeonConfig) -> Self {
        Self {
            dungeon: Dungeon::new(config),
            run: RunController::new(),
            events: EventQueue::new(),
            outbox: Vec::new(),
            scheduler: None,
            agent: Vec3::ZERO,
        }
    }

    fn start_cinematic(&mut self) {
        let layout = self.dungeon.config().layout.clone();
        let mut scheduler =
            self.dungeon
                .generate_cinematic(layout.seed, layout.max_rooms, layout.max_children_per_room);
        // The entry room is needed right away.
        scheduler.advance(0.0, &mut self.dungeon, &mut self.events);
        self.scheduler = Some(scheduler);
    }

    fn finish_setup(&mut self) {
        self.agent = self
            .dungeon
            .get_player_spawn(self.run.current_index())
            .unwrap_or(Vec3::ZERO);
        self.dispatch();
    }

    /// Throw the current dungeon away and build a new one with the same config.
    pub fn restart(&mut self) {
        log::info!("Restarting run");
        if let Some(scheduler) = &mut self.scheduler {
            scheduler.cancel();
        }
        let cinematic = self.scheduler.take().is_some();
        self.events = EventQueue::new();
        self.outbox.clear();
        self.run = RunController::new();
        if cinematic {
            self.start_cinematic();
        } else {
            self.dungeon.generate_from_config(&mut self.events);
        }
        self.finish_setup();
    }

    pub fn state(&self) -> RunState {
        self.run.state()
    }

    pub fn current_room(&self) -> usize {
        self.run.current_index()
    }

    pub fn agent_position(&self) -> Vec3 {
        self.agent
    }

    /// The "confirm" input: begin the run, or request exit after completion.
    pub fn confirm(&mut self) -> bool {
        let handled = self.run.confirm(&mut self.events);
        self.dispatch();
        handled
    }

    pub fn begin_run(&mut self) -> bool {
        let started = self.run.begin_run(&mut self.events);
        self.dispatch();
        started
    }

    /// Move the agent. Entering another room's volume raises room-entered.
    pub fn move_agent(&mut self, position: Vec3) -> Option<usize> {
        self.agent = position;
        let room = self.dungeon.room_at_position(position)?;
        self.room_entered(room);
        Some(room)
    }

    pub fn room_entered(&mut self, index: usize) -> bool {
        let handled = self
            .run
            .on_room_entered(index, self.agent, &mut self.dungeon, &mut self.events);
        self.dispatch();
        handled
    }

    pub fn doorway_passed(&mut self, target: usize) -> bool {
        let handled = self
            .run
            .on_doorway_passed(target, self.agent, &mut self.dungeon, &mut self.events);
        self.dispatch();
        handled
    }

    pub fn enemy_died(&mut self, entity: Entity) -> bool {
        let handled = self.dungeon.enemy_died(entity, &mut self.events);
        self.dispatch();
        handled
    }

    /// Returns true if the hit killed the enemy.
    pub fn damage_enemy(&mut self, entity: Entity, amount: i32) -> bool {
        let killed = self.dungeon.damage_enemy(entity, amount, &mut self.events);
        self.dispatch();
        killed
    }

    pub fn player_died(&mut self) {
        self.run.on_player_died(&mut self.events);
        self.dispatch();
    }

    /// Open the door the agent is aiming at.
    pub fn interact(&mut self, probe: &AimProbe) -> Option<DoorLink> {
        let opened = self.dungeon.interact(probe, &mut self.events);
        self.dispatch();
        opened
    }

    pub fn prompt_visible(&self, room: usize, direction: Direction, probe: &AimProbe) -> bool {
        self.dungeon.prompt_visible(room, direction, probe)
    }

    /// Advance staggered materialization and hand out everything dispatched since the last tick.
    pub fn tick(&mut self, dt: f32) -> TickResult {
        puffin::profile_function!();

        let mut materialized = 0;
        if let Some(scheduler) = &mut self.scheduler {
            materialized = scheduler.advance(dt, &mut self.dungeon, &mut self.events);
            if scheduler.is_finished(&self.dungeon) {
                self.scheduler = None;
            }
        }
        self.dispatch();

        TickResult {
            events: std::mem::take(&mut self.outbox),
            materialized,
        }
    }

    /// Route pending events to the run controller until none are left.
    fn dispatch(&mut self) {
        while !self.events.is_empty() {
            let batch: Vec<DungeonEvent> = self.events.drain().collect();
            for event in batch {
                if let DungeonEvent::RoomCleared { room } = event {
                    self.run.on_room_cleared(room, &self.dungeon, &mut self.events);
                }
                self.outbox.push(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rooms: usize, enemies: usize) -> DungeonConfig {
        let mut config = DungeonConfig::default();
        config.layout.seed = Some(31);
        config.layout.max_rooms = rooms;
        config.spawning.enemy_count = enemies;
        config
    }

    fn state_changes(events: &[DungeonEvent]) -> Vec<RunState> {
        events
            .iter()
            .filter_map(|e| match e {
                DungeonEvent::RunStateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_new_engine_waits_in_pregame() {
        let mut engine = GameEngine::new(config(3, 2));
        assert_eq!(engine.state(), RunState::PreGame);
        assert_eq!(engine.agent_position(), engine.dungeon.get_player_spawn(0).unwrap());
        let tick = engine.tick(0.016);
        assert!(tick.events.iter().any(|e| matches!(e, DungeonEvent::RoomMaterialized { room: 0 })));
    }

    #[test]
    fn test_empty_room_clears_in_same_call() {
        let mut engine = GameEngine::new(config(3, 0));
        engine.confirm();
        assert!(engine.room_entered(1));
        assert_eq!(engine.state(), RunState::DoorInteractable);
    }

    #[test]
    fn test_clearing_last_room_completes() {
        let mut engine = GameEngine::new(config(2, 1));
        engine.confirm();
        engine.room_entered(1);
        assert_eq!(engine.state(), RunState::InCombat);
        let enemy = engine.dungeon.enemies_in(1)[0];
        assert!(engine.damage_enemy(enemy, 1000));
        assert_eq!(engine.state(), RunState::Completed);
        engine.confirm();

        let events = engine.tick(0.0).events;
        assert_eq!(
            state_changes(&events),
            vec![
                RunState::Exploring,
                RunState::InCombat,
                RunState::DoorInteractable,
                RunState::Completed
            ]
        );
        assert!(events.contains(&DungeonEvent::ExitRequested));
    }

    #[test]
    fn test_tick_drains_outbox() {
        let mut engine = GameEngine::new(config(3, 1));
        engine.tick(0.0);
        assert!(engine.tick(0.0).events.is_empty());
    }

    #[test]
    fn test_cinematic_engine_materializes_over_ticks() {
        let mut cfg = config(10, 1);
        cfg.materialize.batch_size = 2;
        cfg.materialize.batch_delay = 1.0;
        let mut engine = GameEngine::new_cinematic(cfg);
        assert_eq!(engine.dungeon.materialized_count(), 2);
        assert!(engine.dungeon.get_player_spawn(0).is_some());
        assert_eq!(engine.tick(1.0).materialized, 2);
        assert_eq!(engine.tick(10.0).materialized, 6);
        assert!(engine.dungeon.is_fully_materialized());
    }

    #[test]
    fn test_restart_resets_run() {
        let mut engine = GameEngine::new(config(4, 2));
        engine.confirm();
        engine.room_entered(1);
        engine.player_died();
        assert_eq!(engine.state(), RunState::Dead);

        engine.restart();
        assert_eq!(engine.state(), RunState::PreGame);
        assert_eq!(engine.current_room(), 0);
        assert_eq!(engine.dungeon.epoch(), 2);
        assert_eq!(engine.dungeon.world().len(), 0);
        assert!(!engine.dungeon.get_room_controller(1).unwrap().has_activated());
    }

    #[test]
    fn test_move_agent_enters_rooms() {
        let mut engine = GameEngine::new(config(3, 1));
        engine.confirm();
        let spawn = engine.dungeon.get_player_spawn(1).unwrap();
        assert_eq!(engine.move_agent(spawn), Some(1));
        assert_eq!(engine.current_room(), 1);
        assert_eq!(engine.state(), RunState::InCombat);
    }
}
