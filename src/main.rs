//! Pathforge headless demo
//!
//! Plans a level, walks a player down the path at a fixed speed and logs what
//! streams in. Usage: `pathforge [seed] [theme] [length_m]`.
//!
//! Set `PATHFORGE_SETTINGS` to a JSON file to override generation settings and
//! `RUST_LOG=debug` for per-segment output.

use pathforge::consts::*;
use pathforge::level::Theme;
use pathforge::sim::{LevelEvent, TickInput, tick};
use pathforge::{GenerationSettings, Level, LevelRequest};

/// Player run speed (m/s)
const RUN_SPEED: f32 = 12.0;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);
    let theme = args
        .next()
        .and_then(|s| Theme::from_str(&s))
        .unwrap_or_default();
    let length_m = args.next().and_then(|s| s.parse().ok()).unwrap_or(600.0);

    let settings = match std::env::var("PATHFORGE_SETTINGS") {
        Ok(path) => GenerationSettings::load(path),
        Err(_) => GenerationSettings::default(),
    };

    log::info!("Pathforge starting: seed={seed} theme={} length={length_m}m", theme.as_str());
    let request = LevelRequest {
        theme,
        length_m,
        seed,
        is_tutorial: false,
    };
    let mut level = Level::new(&request, &settings);

    // Walk the planned centerline, one fixed step per tick
    let waypoints: Vec<_> = level
        .segments
        .iter()
        .flat_map(|s| [s.start.position, s.end.position])
        .collect();
    let step = RUN_SPEED * SIM_DT;
    let mut destroyed = 0;
    let mut phase_changes = 0;

    for pair in waypoints.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let distance = from.distance(to);
        let steps = (distance / step).ceil().max(1.0) as u32;
        for i in 0..steps {
            let input = TickInput {
                player_position: from.lerp(to, i as f32 / steps as f32),
                ..Default::default()
            };
            for event in tick(&mut level, &input, SIM_DT) {
                match event {
                    LevelEvent::SegmentActivated { segment } => log::info!("+ segment {segment}"),
                    LevelEvent::SegmentDeactivated { segment } => log::info!("- segment {segment}"),
                    LevelEvent::ObstacleDestroyed { .. } => destroyed += 1,
                    LevelEvent::ObstaclePhaseChanged { .. } => phase_changes += 1,
                    _ => {}
                }
            }
        }
    }

    log::info!("Run finished: {destroyed} obstacles destroyed, {phase_changes} phase changes");
    match serde_json::to_string_pretty(&level.summary()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::warn!("Failed to serialize summary: {err}"),
    }
}
