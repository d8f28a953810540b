//! Prepare the upload and output directories.

use hookreel_assembly::inventory::category_dir;
use hookreel_common::config::{config_file_path, AppConfig};
use hookreel_model::Category;

pub fn run(config: &AppConfig, write_config: bool) -> anyhow::Result<()> {
    let storage = &config.storage;
    println!("Preparing HookReel workspace");

    for category in Category::ORDER {
        let dir = category_dir(storage, category);
        std::fs::create_dir_all(&dir)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", dir.display()))?;
        let marker = if category.is_required() { "" } else { " (optional)" };
        println!("  {:<16} {}{marker}", category.to_string(), dir.display());
    }

    std::fs::create_dir_all(&storage.output_dir).map_err(|e| {
        anyhow::anyhow!("Failed to create {}: {e}", storage.output_dir.display())
    })?;
    println!("  {:<16} {}", "output", storage.output_dir.display());

    if write_config {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;
        println!();
        println!("Configuration written to {}", config_file_path().display());
    }

    println!();
    println!(
        "Drop segments ({}) into the category folders, then run `hookreel plan`.",
        storage.extensions.join(", ")
    );
    Ok(())
}
