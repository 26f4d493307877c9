//! Hilo dedicado para el pipeline, desacoplado del lector de muestras
//! por una cola acotada. Si la cola está llena se descartan muestras:
//! el lector del sensor nunca se bloquea.
//!
//! Muestras y resets comparten cola, así que el hilo los aplica en el
//! orden en que se enviaron.

use crate::pipeline::GesturePipeline;
use crate::types::Sample;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("No se pudo lanzar el hilo del pipeline: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("El hilo del pipeline ha terminado")]
    Disconnected,

    #[error("El hilo del pipeline entró en pánico")]
    Panicked,
}

/// Lo que viaja por la cola del pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Msg {
    Sample(Sample),
    /// Olvidar ventana, historial y cooldowns (p. ej. tras reconectar)
    Reset,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub samples: u64,
    pub windows: u64,
    pub actions: u64,
}

/// Extremo productor. Al soltarlo el hilo procesa lo pendiente y termina.
pub struct SampleFeeder {
    queue: Sender<Msg>,
    dropped: Arc<AtomicU64>,
}

impl SampleFeeder {
    fn new(queue: Sender<Msg>) -> Self {
        Self {
            queue,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Encola sin bloquear. `false` si la muestra se descartó.
    pub fn offer(&self, sample: Sample) -> bool {
        match self.queue.try_send(Msg::Sample(sample)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 100 == 0 {
                    warn!("⚠️  Cola del pipeline llena: {} muestras descartadas", dropped);
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Encola un reset detrás de las muestras ya enviadas. Espera hueco
    /// en la cola si está llena: un reset nunca se descarta.
    pub fn reset(&self) -> Result<(), WorkerError> {
        self.queue
            .send(Msg::Reset)
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Muestras descartadas por cola llena
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct PipelineWorker {
    handle: JoinHandle<WorkerStats>,
}

impl PipelineWorker {
    /// Espera a que el hilo termine (hay que soltar antes el `SampleFeeder`)
    pub fn join(self) -> Result<WorkerStats, WorkerError> {
        self.handle.join().map_err(|_| WorkerError::Panicked)
    }
}

/// Lanza el pipeline en su propio hilo con una cola de `queue` mensajes
pub fn spawn_pipeline_worker(
    pipeline: GesturePipeline,
    queue: usize,
) -> Result<(SampleFeeder, PipelineWorker), WorkerError> {
    let (tx, rx) = bounded::<Msg>(queue.max(1));

    let handle = std::thread::Builder::new()
        .name("gestodron-pipeline".into())
        .spawn(move || run(pipeline, rx))?;

    Ok((SampleFeeder::new(tx), PipelineWorker { handle }))
}

/// Consume la cola hasta que el productor se suelta y ya no queda nada
fn run(mut pipeline: GesturePipeline, queue: Receiver<Msg>) -> WorkerStats {
    let mut stats = WorkerStats::default();

    for msg in queue.iter() {
        match msg {
            Msg::Sample(sample) => {
                stats.samples += 1;
                if let Some(event) = pipeline.feed(sample) {
                    stats.windows += 1;
                    if !event.is_nothing() {
                        stats.actions += 1;
                    }
                }
            }
            Msg::Reset => pipeline.reset(),
        }
    }

    debug!("hilo del pipeline terminado: {:?}", stats);
    info!(
        "🏁 {} muestras, {} ventanas, {} acciones",
        stats.samples, stats.windows, stats.actions
    );
    stats
}
