mod app;

use brain_scene::VizConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = VizConfig::load()?;
    log::debug!("config: {:?}", config);

    match config.headless_frames {
        Some(frames) => app::run_headless(&config, frames),
        None => app::run_windowed(&config),
    }
}
