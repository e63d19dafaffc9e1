#![deny(warnings)]

use persistence::{default_sqlite_url, init_db, list_slots};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    // SQLite creates the file but not its directory
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path.filter(|p| !p.starts_with(':')) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = init_db(&url).await?;
    let slots = list_slots(&pool).await?;
    println!("DB migrated at {} ({} save slots)", url, slots.len());
    for s in slots {
        println!("  {:<16} {}  ${}", s.slot, s.game_date, s.money);
    }
    Ok(())
}
