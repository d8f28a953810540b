//! Preview the combinations a batch would render.

use serde::Serialize;

use hookreel_assembly::{BatchRunner, Combinations, SegmentInventory};
use hookreel_common::config::AppConfig;
use hookreel_model::JobSettings;

#[derive(Serialize)]
struct PlannedAd {
    sequence: usize,
    output: String,
    segments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_complex: Option<String>,
}

pub fn run(
    config: &AppConfig,
    settings: JobSettings,
    show_graph: bool,
    json: bool,
) -> anyhow::Result<()> {
    let inventory = SegmentInventory::discover(&config.storage, &config.limits, &settings)?;
    for note in inventory.notes() {
        eprintln!("Note: {note}");
    }

    let runner = BatchRunner::from_config(config);
    let mut planner = runner.planner();
    let combinations = Combinations::new(&inventory);
    let total = combinations.total();

    let mut planned = Vec::with_capacity(total);
    for (idx, combination) in combinations.enumerate() {
        let sequence = idx + 1;
        let filter_complex = if show_graph {
            let request = runner.prepare(sequence, &combination, &settings, &mut planner)?;
            Some(request.graph.to_filter_complex())
        } else {
            None
        };
        planned.push(PlannedAd {
            sequence,
            output: combination.output_name(sequence, &config.encoding.output_extension),
            segments: combination
                .segments()
                .iter()
                .map(|s| s.path.display().to_string())
                .collect(),
            filter_complex,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    println!(
        "{total} combination(s), {}",
        if settings.use_transition {
            format!("cross-dissolve {:.2}s", config.encoding.transition_secs)
        } else {
            "hard cuts".to_string()
        }
    );
    for ad in &planned {
        println!("  [{}/{total}] {}", ad.sequence, ad.output);
        if let Some(graph) = &ad.filter_complex {
            println!("      {graph}");
        }
    }
    Ok(())
}
