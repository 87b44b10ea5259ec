//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    if settings.gemini.api_key.is_none() {
        println!(
            "{} No Gemini API key configured; set GEMINI_API_KEY before grading",
            style("!").yellow()
        );
    }

    println!(
        "{} Initialized Gradebook in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  Database: {}", settings.database_path().display());
    println!("  Uploads:  {}", settings.upload_dir.display());

    Ok(())
}
