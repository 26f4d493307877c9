/*
Reconocimiento de gestos para dron - DTW + k-NN

1. Lee muestras del acelerómetro por stdin (CSV sin cabecera:
   timestamp_ms,ax,ay,az[,gx,gy,gz])
2. Las procesa en un hilo dedicado: ventanas -> k-NN -> motor de decisión
3. Cada acción decidida llega al hilo actuador

Ejemplo:
    sensor-bridge | ./target/release/gestodron --config gestodron.json

Más detalle en el log:
    RUST_LOG=gestodron=debug ./target/release/gestodron --config gestodron.json
*/

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use std::io;
use std::path::PathBuf;

use gestodron::config::load_pipeline;
use gestodron::sample_csv::sample_records;
use gestodron::types::ActionEvent;
use gestodron::worker::spawn_pipeline_worker;

#[derive(Parser, Debug)]
#[command(name = "gestodron", about = "Gestos del acelerómetro -> acciones del dron")]
struct Cli {
    /// Configuración JSON del pipeline
    #[arg(long)]
    config: PathBuf,

    /// Muestras en cola antes de empezar a descartar
    #[arg(long, default_value_t = 256)]
    queue: usize,

    /// Un salto de timestamps mayor que esto (ms) se trata como reconexión
    /// del sensor y reinicia el pipeline
    #[arg(long, default_value_t = 1000)]
    reset_gap_ms: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gestodron=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    println!("🎯 Gestodron - DTW + k-NN\n");

    println!("🔧 Cargando configuración {:?}...", cli.config);
    let (config, pipeline) = load_pipeline(&cli.config)?;
    println!(
        "✅ Pipeline listo: ventana {} / paso {}, k={}, {:?}\n",
        config.window_size,
        config.step,
        pipeline.classifier().k(),
        config.distance
    );

    // Hilo actuador: aquí se conectaría el protocolo del dron
    let (tx_action, rx_action) = unbounded::<ActionEvent>();
    let actuator = std::thread::spawn(move || {
        while let Ok(event) = rx_action.recv() {
            match event.hold {
                Some(hold) => println!(
                    "🎮 {} @ {} ms (mantener {} ms)",
                    event.label,
                    event.timestamp_ms,
                    hold.as_millis()
                ),
                None => println!("🎮 {} @ {} ms", event.label, event.timestamp_ms),
            }
        }
    });

    let (feeder, worker) = spawn_pipeline_worker(pipeline.with_sink(tx_action), cli.queue)
        .context("No se pudo lanzar el pipeline")?;

    println!("🎬 Leyendo muestras de stdin...\n");

    let mut last_timestamp: Option<u64> = None;
    for sample in sample_records(io::stdin().lock(), false) {
        let sample = match sample {
            Ok(sample) => sample,
            Err(e) => {
                eprintln!("❌ {:#}", e);
                continue;
            }
        };

        if let Some(prev) = last_timestamp {
            if sample.timestamp_ms.abs_diff(prev) > cli.reset_gap_ms {
                println!("🔌 Salto de {} ms: reiniciando", sample.timestamp_ms.abs_diff(prev));
                feeder.reset()?;
            }
        }
        last_timestamp = Some(sample.timestamp_ms);

        feeder.offer(sample);
    }

    let dropped = feeder.dropped();
    drop(feeder);
    let stats = worker.join()?;
    if actuator.join().is_err() {
        eprintln!("❌ El hilo actuador terminó con pánico");
    }

    println!(
        "\n👋 Fin: {} muestras, {} ventanas, {} acciones, {} descartadas",
        stats.samples, stats.windows, stats.actions, dropped
    );
    Ok(())
}
