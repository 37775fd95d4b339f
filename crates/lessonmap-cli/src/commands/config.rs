use anyhow::Result;
use colored::Colorize;
use lessonmap_core::config::ConfigOverrides;
use lessonmap_infrastructure::{ConfigService, LessonMapPaths};

pub fn show(overrides: ConfigOverrides) -> Result<()> {
    let paths = LessonMapPaths::resolve()?;
    let service = ConfigService::new(&paths);
    let config = service.resolve(overrides)?;

    println!("{}", format!("# {}", service.path().display()).bright_black());
    print!("{}", toml::to_string_pretty(&config)?);
    if config.store_dir.is_none() {
        println!(
            "{}",
            format!("# store_dir = \"{}\"", paths.content_store_dir().display()).bright_black()
        );
    }
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = LessonMapPaths::resolve()?;
    let service = ConfigService::new(&paths);
    service.set(key, value)?;
    println!("{} {} = {}", "✔".green(), key, value);
    Ok(())
}
