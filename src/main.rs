use log::{info, warn};
use std::error::Error;

use timetable::{Timetable, TimetableConfig, app, saving};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = TimetableConfig::load()?;
    info!(
        "grid: {} days x {} time slots",
        config.days.len(),
        config.time_slots.len()
    );

    // Start from the last snapshot when one exists
    let mut timetable = Timetable::from_config(&config);
    if config.data_file.exists() {
        if let Err(e) = saving::load_timetable(&mut timetable, &config.data_file) {
            warn!(
                "could not load {}: {}, starting empty",
                config.data_file.display(),
                e
            );
            timetable.clear();
        }
    }

    app::run(config, timetable).await?;

    Ok(())
}
