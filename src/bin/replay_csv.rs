use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gestodron::config::load_pipeline;
use gestodron::sample_csv::load_samples_from_csv;

#[derive(Parser, Debug)]
#[command(name = "replay_csv", about = "Reproduce un flujo grabado por el pipeline")]
struct Cli {
    /// Configuración JSON del pipeline
    #[arg(long)]
    config: PathBuf,

    /// CSV con cabecera timestamp_ms,ax,ay,az[,gx,gy,gz]
    samples: PathBuf,

    /// Imprime votos, distancias y vecinos de cada ventana
    #[arg(long)]
    dump_knn: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gestodron=warn".into()),
        )
        .init();

    println!("🎞️  Reproduciendo {:?}", cli.samples);

    let (config, mut pipeline) = load_pipeline(&cli.config)?;
    let samples = load_samples_from_csv(&cli.samples)?;
    println!(
        "ℹ️  {} muestras, ventana {} / paso {}",
        samples.len(),
        config.window_size,
        config.step
    );

    let mut fired = 0usize;
    for sample in samples {
        let Some(report) = pipeline.feed_report(sample) else {
            continue;
        };

        if cli.dump_knn {
            let nearest = report.result.nearest_neighbor();
            println!(
                "\n🪟 Ventana {} @ {} ms | energía {:.1} | vecino {} (d={:.1})",
                report.index,
                report.event.timestamp_ms,
                report.energy,
                nearest.label,
                nearest.distance
            );
            for stats in &report.result.ranking {
                println!(
                    "  {:<12} votos {:>2}  media {:>12.1}  mínima k-NN {}",
                    stats.label.as_str(),
                    stats.votes,
                    stats.mean_distance,
                    stats
                        .nearest_distance
                        .map_or_else(|| "-".to_string(), |d| format!("{:.1}", d))
                );
            }
        }

        if !report.event.is_nothing() {
            fired += 1;
            println!(
                "🥇 {} @ {} ms (ventana {})",
                report.event.label, report.event.timestamp_ms, report.index
            );
        }
    }

    println!(
        "\n🗳️  {} ventanas, {} acciones",
        pipeline.windows_processed(),
        fired
    );
    Ok(())
}
