//! Headless driver: generates a dungeon and plays a scripted run through it.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use cubic_dungeon::constants::ENTRY_ROOM_INDEX;
use cubic_dungeon::direction::Direction;
use cubic_dungeon::door::{AimProbe, DoorState};
use cubic_dungeon::events::DungeonEvent;
use cubic_dungeon::{DungeonConfig, GameEngine, RunState};

/// Simulated frame time for the scripted run
const FRAME_DT: f32 = 1.0 / 60.0;
/// Damage dealt per scripted hit
const SCRIPTED_HIT: i32 = 7;
/// How far in front of a door the scripted agent stands to open it
const DOOR_APPROACH: f32 = 1.5;

/// Cubic dungeon generator and run simulator
#[derive(Parser, Debug)]
#[command(name = "cubic-dungeon")]
#[command(author, version, about = "Generate a cubic-room dungeon and play through it", long_about = None)]
struct Args {
    /// JSON config file (missing fields use defaults)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Generation seed (overrides the config; omit for a random dungeon)
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Room cap (overrides the config)
    #[arg(short = 'r', long = "rooms")]
    rooms: Option<usize>,

    /// Materialize rooms in timed batches instead of all at once
    #[arg(long = "cinematic")]
    cinematic: bool,

    /// Print the room layout as JSON and exit
    #[arg(long = "dump-layout")]
    dump_layout: bool,

    /// Record puffin profiling scopes
    #[arg(long = "profile")]
    profile: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    use simplelog::LevelFilter::{Debug, Info, Off};
    simplelog::TermLogger::init(
        if args.verbose { Debug } else { Info },
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    puffin::set_scopes_on(args.profile);

    let mut config = match &args.config {
        Some(path) => DungeonConfig::load(path)?,
        None => DungeonConfig::default(),
    };
    if args.seed.is_some() {
        config.layout.seed = args.seed;
    }
    if let Some(rooms) = args.rooms {
        config.layout.max_rooms = rooms;
    }
    config.validate()?;
    let config = config.validated();

    let mut engine = if args.cinematic {
        GameEngine::new_cinematic(config)
    } else {
        GameEngine::new(config)
    };
    while !engine.dungeon.is_fully_materialized() {
        tick(&mut engine);
    }

    if args.dump_layout {
        println!("{}", serde_json::to_string_pretty(engine.dungeon.graph().rooms())?);
        return Ok(());
    }

    log::info!("Dungeon ready with {} rooms", engine.dungeon.room_count());
    engine.confirm();
    play(&mut engine);
    tick(&mut engine);

    if engine.state() == RunState::Completed {
        engine.confirm();
        tick(&mut engine);
    }
    log::info!("Run ended in {:?} at room {}", engine.state(), engine.current_room());
    Ok(())
}

fn tick(engine: &mut GameEngine) {
    let result = engine.tick(FRAME_DT);
    for event in &result.events {
        match event {
            DungeonEvent::RunStateChanged { from, to } => log::info!("{from:?} -> {to:?}"),
            DungeonEvent::ExitRequested => log::info!("Exit requested"),
            other => log::debug!("{other:?}"),
        }
    }
    puffin::GlobalProfiler::lock().new_frame();
}

/// Depth-first walk over the door tree, clearing every room on the way.
fn play(engine: &mut GameEngine) {
    let mut visited = vec![false; engine.dungeon.room_count()];
    let mut stack = vec![ENTRY_ROOM_INDEX];
    if let Some(entry) = visited.get_mut(ENTRY_ROOM_INDEX) {
        *entry = true;
    }

    while let Some(&here) = stack.last() {
        if matches!(engine.state(), RunState::Completed | RunState::Dead) {
            break;
        }
        let next = engine.dungeon.get_room_controller(here).and_then(|room| {
            room.doors()
                .iter()
                .find_map(|door| door.target.filter(|t| !visited[*t]).map(|t| (door.direction, t)))
        });

        match next {
            Some((direction, target)) => {
                visited[target] = true;
                if !walk_through(engine, here, direction, target) {
                    continue;
                }
                stack.push(target);
                fight(engine, target);
            }
            None => {
                stack.pop();
                let Some(&back) = stack.last() else {
                    break;
                };
                let door_back = engine.dungeon.get_room_controller(here).and_then(|room| {
                    room.doors()
                        .iter()
                        .find(|door| door.target == Some(back))
                        .map(|door| door.direction)
                });
                let walked = door_back.is_some_and(|direction| walk_through(engine, here, direction, back));
                if !walked {
                    log::warn!("Could not walk back from room {here} to room {back}");
                    break;
                }
            }
        }
        tick(engine);
    }
}

/// Open the door of `room` facing `direction` if needed and pass into `target`.
fn walk_through(engine: &mut GameEngine, room: usize, direction: Direction, target: usize) -> bool {
    let Some(door) = engine
        .dungeon
        .get_room_controller(room)
        .and_then(|r| r.get_door(direction))
        .cloned()
    else {
        return false;
    };
    let aim = direction.step().as_vec3();
    let probe = AimProbe::new(door.position - aim * DOOR_APPROACH, aim);
    engine.move_agent(probe.origin);
    if door.state() == DoorState::Closed && engine.interact(&probe).is_none() {
        log::warn!("Door {direction} of room {room} did not open");
    }

    engine.move_agent(door.position);
    if !engine.doorway_passed(target) {
        log::warn!("Passage from room {room} to room {target} refused in {:?}", engine.state());
        return false;
    }
    if let Some(spawn) = engine.dungeon.get_player_spawn(target) {
        engine.move_agent(spawn);
    }
    true
}

fn fight(engine: &mut GameEngine, room: usize) {
    for enemy in engine.dungeon.enemies_in(room) {
        while !engine.damage_enemy(enemy, SCRIPTED_HIT) {
            if !engine.dungeon.world().contains(enemy) {
                break;
            }
        }
    }
}
