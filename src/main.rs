//! Tether Volley headless runner
//!
//! Plays a scripted match through the fixed-timestep loop, acting as the host
//! collision engine with the crate's sweep helpers, and prints every game
//! event as a JSON line.
//!
//! Usage: `tether-volley [practice|versus|coop] [seed] [frames]`
//! `TETHER_TUNING=path.json` loads balance overrides.

#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
use tether_volley::consts::{MAX_SUBSTEPS, SIM_DT};
#[cfg(not(target_arch = "wasm32"))]
use tether_volley::sim::clock;
#[cfg(not(target_arch = "wasm32"))]
use tether_volley::sim::{
    Action, Contacts, GameMode, GameState, InputFrame, KeyBindings, tick_with_collisions,
};
#[cfg(not(target_arch = "wasm32"))]
use tether_volley::{Player, Tuning};

/// Frame lengths the runner cycles through, to exercise the accumulator
#[cfg(not(target_arch = "wasm32"))]
const FRAME_PATTERN: [f32; 4] = [1.0 / 60.0, 1.0 / 60.0, 1.0 / 30.0, 1.0 / 144.0];

#[cfg(not(target_arch = "wasm32"))]
struct Runner {
    state: GameState,
    contacts: Contacts,
    accumulator: f32,
    frame: u64,
}

#[cfg(not(target_arch = "wasm32"))]
impl Runner {
    fn new(seed: u64, mode: GameMode, tuning: Tuning) -> Self {
        Self {
            state: GameState::new(seed, mode, tuning),
            contacts: Contacts::default(),
            accumulator: 0.0,
            frame: 0,
        }
    }

    /// Run simulation ticks for one rendered frame
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.scripted_input();
            tick_with_collisions(&mut self.state, &input, SIM_DT, &mut self.contacts);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        self.frame += 1;
    }

    /// Both paddles chase the nearest free particle, launch on a timer,
    /// keep their tethers on and claim whenever something is claimable
    fn scripted_input(&self) -> InputFrame {
        let mut input = InputFrame::new();
        let ticks = self.state.clock.ticks();
        let tuning = &self.state.tuning;

        for player in Player::ALL {
            let keys: &KeyBindings = if player == Player::One {
                &tuning.p1_keys
            } else {
                &tuning.p2_keys
            };
            let paddle = self.state.paddle(player);

            let target = self
                .state
                .particles
                .iter()
                .filter(|(_, p)| p.is_free())
                .min_by(|(_, a), (_, b)| {
                    let da = (a.pos.x - paddle.pos.x).abs();
                    let db = (b.pos.x - paddle.pos.x).abs();
                    da.total_cmp(&db)
                })
                .map(|(_, p)| p.pos.y);
            if let Some(y) = target {
                if y < paddle.pos.y - 20.0 {
                    input.set_key(keys.key_for(Action::Up), true);
                } else if y > paddle.pos.y + 20.0 {
                    input.set_key(keys.key_for(Action::Down), true);
                }
            }

            // Wobble the paddle so strikes come off at varied angles
            if (ticks / 45) % 3 == 1 {
                input.set_key(keys.key_for(Action::Left), true);
            }

            let phase = if player == Player::One { 0 } else { 30 };
            if (ticks + phase) % 60 == 0 {
                input.set_key(keys.key_for(Action::North), true);
            }
            if ticks == 1 {
                input.set_key(keys.key_for(Action::East), true);
            }
            let claimable = self.state.particles.iter().any(|(_, p)| p.is_claimable());
            if claimable && (ticks + phase) % 90 == 0 {
                input.set_key(keys.key_for(Action::South), true);
            }
        }
        input
    }

    fn flush_events(&mut self) {
        for event in self.state.drain_events() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => log::warn!("Could not encode event {:?}: {}", event, e),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn load_tuning() -> Result<Tuning, String> {
    let Ok(path) = std::env::var("TETHER_TUNING") else {
        return Ok(Tuning::default());
    };
    let json = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
    Tuning::from_json(&json).map_err(|e| format!("{path}: {e}"))
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_mode(arg: Option<&str>) -> Option<GameMode> {
    match arg.unwrap_or("versus") {
        "practice" => Some(GameMode::Practice),
        "versus" => Some(GameMode::Versus),
        "coop" | "cooperative" => Some(GameMode::Cooperative),
        _ => None,
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(mode) = parse_mode(args.first().map(String::as_str)) else {
        eprintln!("usage: tether-volley [practice|versus|coop] [seed] [frames]");
        return ExitCode::FAILURE;
    };
    let seed = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let frames: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(3_600);

    let tuning = match load_tuning() {
        Ok(tuning) => tuning,
        Err(e) => {
            log::error!("Invalid tuning: {}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Tether Volley (headless) starting: {:?}, seed {}", mode, seed);
    let started = clock::now_ms(None);
    let mut runner = Runner::new(seed, mode, tuning);

    while runner.frame < frames && !runner.state.is_over() {
        let dt = FRAME_PATTERN[(runner.frame % FRAME_PATTERN.len() as u64) as usize];
        runner.update(dt);
        runner.flush_events();
    }
    runner.flush_events();

    log::info!(
        "Finished after {} frames / {} ticks ({:.1} ms wall): {:?}, scores {:?}",
        runner.frame,
        runner.state.clock.ticks(),
        clock::now_ms(None) - started,
        runner.state.phase,
        runner.state.scores
    );
    ExitCode::SUCCESS
}
