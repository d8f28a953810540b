//! Check system capabilities.

use hookreel_assembly::inventory::{category_dir, list_media_files};
use hookreel_assembly::invoker::command_exists;
use hookreel_common::config::AppConfig;
use hookreel_model::Category;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("HookReel System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for binary in [&config.ffmpeg_bin, &config.ffprobe_bin] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[MISSING] {binary} not found on PATH");
            ready = false;
        }
    }

    println!();
    let storage = &config.storage;
    let cap = config.limits.max_segments_per_category;
    for category in Category::ORDER {
        let dir = category_dir(storage, category);
        let found = list_media_files(&dir, storage, usize::MAX)?.len();
        let status = match (found, category.is_required()) {
            (0, true) => {
                ready = false;
                "[MISSING]"
            }
            (0, false) => "[SKIP]",
            _ => "[OK]",
        };
        let capped = if found > cap {
            format!(" (first {cap} used)")
        } else {
            String::new()
        };
        println!(
            "{status} {category}: {found} file(s) in {}{capped}",
            dir.display()
        );
    }
    println!("[OK] Output directory: {}", storage.output_dir.display());

    println!();
    if ready {
        println!("All requirements are met. HookReel is ready to render.");
    } else {
        println!("Some requirements are missing. See above for fixes.");
    }
    Ok(())
}
