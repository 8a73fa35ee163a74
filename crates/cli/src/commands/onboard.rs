//! `boardroom onboard`: first-time setup.

use boardroom_config::{AppConfig, StorageBackend};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🏛️  Boardroom: First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let storage_path = config.storage.resolved_path();
    match config.storage.backend {
        StorageBackend::Memory => println!("  Storage: in-memory (nothing is kept between runs)"),
        StorageBackend::File => {
            std::fs::create_dir_all(&storage_path)?;
            println!("✅ Storage directory: {}", storage_path.display());
        }
        StorageBackend::Sqlite => {
            if let Some(parent) = storage_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            println!("✅ SQLite database: {}", storage_path.display());
        }
    }

    println!("  Agents:    {}", config.agents.len());
    println!("  Workflows: {}", config.workflows.len());

    if config.has_api_key() {
        println!("\n🎉 Setup complete! Try: boardroom run --goal \"Plan the product launch\"\n");
    } else {
        println!("\n📝 Next steps:");
        println!("   1. Set BOARDROOM_API_KEY (or add api_key to {})", config_path.display());
        println!("   2. Run: boardroom run --goal \"Plan the product launch\"\n");
    }

    Ok(())
}
