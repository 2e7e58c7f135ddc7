use std::fs;
use std::process;
use std::rc::Rc;

use brain_runtime::core::logging::init_tracing;
use brain_runtime::{BrainRuntime, RuntimeConfig};

const USAGE: &str = "usage: brain_runtime <brain.js> [state.json]";

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(brain_path) = args.next() else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };
    let state_path = args.next();

    if let Err(e) = run(&brain_path, state_path.as_deref()) {
        eprintln!("brain_runtime failed: {}", e);
        process::exit(1);
    }
}

fn run(brain_path: &str, state_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = RuntimeConfig::load_or_default();
    init_tracing(&config.logging);

    let source = fs::read_to_string(brain_path)?;
    let state = match state_path {
        Some(path) => fs::read_to_string(path)?,
        None => "{}".to_string(),
    };

    let mut runtime = BrainRuntime::new(config);
    runtime.set_debug_log(Some(Rc::new(|msg: &str| println!("[brain] {}", msg))));
    runtime.set_error_log(Some(Rc::new(|msg: &str| eprintln!("[brain] {}", msg))));

    let runtime_dir = std::env::current_dir()?;
    runtime.initialize(&runtime_dir.to_string_lossy())?;
    runtime.reset_brain("main", &source)?;
    runtime.update_agent("main", "cli", &state, |json| println!("{}", json))?;
    runtime.deinitialize()?;
    Ok(())
}
