use crate::context::AppContext;
use anyhow::Result;
use colored::Colorize;

pub async fn clear(ctx: &AppContext) -> Result<()> {
    let store = ctx.content_store();
    let count = store.len().await?;
    ctx.node_content().clear().await?;
    println!(
        "{} Removed {} cached subtopic entries from {}",
        "✔".green(),
        count,
        store.dir().display()
    );
    Ok(())
}
