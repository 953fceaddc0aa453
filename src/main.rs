//! Joy-Con Bridge - Main Application
//!
//! Opens every controller listed in configs/default.toml, shows its player
//! number on the LEDs and prints its calibrated state as it changes.

use joycon_bridge::config::{Config, ControllerConfig};
use joycon_bridge::joycon::{self, ControllerState, JoyCon, JoyConError, SessionOptions};
use log::{error, info, warn};
use std::error::Error;
use std::thread;
use std::time::Duration;

/// Pause before reopening a controller that stopped responding
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

fn format_state(state: &ControllerState) -> String {
    let b = &state.buttons;
    let pressed: Vec<&str> = [
        (b.a, "A"), (b.b, "B"), (b.x, "X"), (b.y, "Y"),
        (b.r, "R"), (b.zr, "ZR"), (b.l, "L"), (b.zl, "ZL"),
        (b.up, "Up"), (b.down, "Down"), (b.left, "Left"), (b.right, "Right"),
        (b.plus, "+"), (b.minus, "-"), (b.home, "Home"), (b.capture, "Capture"),
        (b.left_stick, "LS"), (b.right_stick, "RS"),
        (b.sl_left, "SL(L)"), (b.sr_left, "SR(L)"), (b.sl_right, "SL(R)"), (b.sr_right, "SR(R)"),
    ]
    .iter()
    .filter(|(down, _)| *down)
    .map(|(_, name)| *name)
    .collect();

    format!(
        concat!(
            "[{:?}] buttons: [{}] L: ({:+.2}, {:+.2}) R: ({:+.2}, {:+.2}) ",
            "accel: ({:+.2}, {:+.2}, {:+.2}) gyro: ({:+.2}, {:+.2}, {:+.2}) battery: {}{}",
        ),
        state.hand,
        pressed.join(" "),
        state.left_stick.x, state.left_stick.y,
        state.right_stick.x, state.right_stick.y,
        state.accelerometer.x, state.accelerometer.y, state.accelerometer.z,
        state.gyroscope.x, state.gyroscope.y, state.gyroscope.z,
        state.battery.level,
        if state.battery.charging { " (charging)" } else { "" },
    )
}

fn print_state(state: &ControllerState, json: bool) {
    if json {
        match serde_json::to_string(state) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize state: {}", e),
        }
    } else {
        println!("{}", format_state(state));
    }
}

fn open_session(
    controller: &ControllerConfig,
    options: SessionOptions,
) -> Result<JoyCon, JoyConError> {
    let mut session = joycon::open(
        controller.hand,
        controller.path.as_deref(),
        controller.serial.as_deref(),
        options,
    )?;

    if let Some(player) = controller.player {
        session.set_player_leds_by_number(player)?;
    }
    Ok(session)
}

/// Poll one controller forever, reopening it when it stops responding.
fn run_controller(controller: ControllerConfig, options: SessionOptions, json: bool) {
    loop {
        let mut session = match open_session(&controller, options) {
            Ok(session) => session,
            Err(e) => {
                warn!("{:?} Joy-Con unavailable: {}", controller.hand, e);
                thread::sleep(RECONNECT_DELAY);
                continue;
            }
        };
        info!("✓ {:?} Joy-Con connected", controller.hand);

        let mut last = None;
        loop {
            match session.poll() {
                Ok(()) => {
                    let state = session.state();
                    if last != Some(state) {
                        print_state(&state, json);
                        last = Some(state);
                    }
                }
                Err(JoyConError::NotResponding) => {
                    warn!("{:?} Joy-Con stopped responding, reconnecting", controller.hand);
                    break;
                }
                Err(e) => {
                    error!("{:?} Joy-Con failed: {}", controller.hand, e);
                    break;
                }
            }
        }

        drop(session);
        thread::sleep(RECONNECT_DELAY);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Joy-Con Bridge ===");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let config = Config::load_default()?;
    println!("✓ Loaded configuration from configs/default.toml");

    let options = config.session_options();
    let json = config.settings.print_json;

    let handles: Vec<_> = config
        .controllers
        .into_iter()
        .map(|controller| {
            let name = format!("joycon-{:?}", controller.hand).to_lowercase();
            thread::Builder::new()
                .name(name)
                .spawn(move || run_controller(controller, options, json))
        })
        .collect::<Result<_, _>>()?;

    for handle in handles {
        if handle.join().is_err() {
            error!("Controller thread panicked");
        }
    }

    Ok(())
}
