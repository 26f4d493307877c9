//! Cadena completa para un flujo de muestras:
//! acumulador -> k-NN -> motor de decisión -> actuador.

use crate::classifier::{ClassificationResult, KnnClassifier};
use crate::decision::GestureDecisionEngine;
use crate::motion::{accel_series, motion_energy};
use crate::sink::ActionSink;
use crate::types::{ActionEvent, Sample};
use crate::window_accumulator::{AccumulatorError, WindowAccumulator};
use tracing::{debug, info, warn};

/// Todo lo que se sabe de una ventana procesada
#[derive(Debug, Clone)]
pub struct WindowReport {
    /// Número de ventana desde el inicio (o el último reset)
    pub index: u64,
    pub result: ClassificationResult,
    pub energy: f32,
    pub event: ActionEvent,
}

pub struct GesturePipeline {
    accumulator: WindowAccumulator<Sample>,
    classifier: KnnClassifier,
    engine: GestureDecisionEngine,
    sink: Option<Box<dyn ActionSink>>,
    windows: u64,
}

impl GesturePipeline {
    /// El tamaño de ventana lo fija el clasificador
    pub fn new(
        classifier: KnnClassifier,
        engine: GestureDecisionEngine,
        step: usize,
    ) -> Result<Self, AccumulatorError> {
        Ok(Self {
            accumulator: WindowAccumulator::new(classifier.window_size(), step)?,
            classifier,
            engine,
            sink: None,
            windows: 0,
        })
    }

    pub fn with_sink(mut self, sink: impl ActionSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Procesa una muestra. Devuelve la decisión (quizá NOTHING) cuando la
    /// muestra completa una ventana.
    pub fn feed(&mut self, sample: Sample) -> Option<ActionEvent> {
        self.feed_report(sample).map(|report| report.event)
    }

    pub fn feed_report(&mut self, sample: Sample) -> Option<WindowReport> {
        let window = self.accumulator.add(sample)?;
        let now_ms = window.last().map_or(sample.timestamp_ms, |s| s.timestamp_ms);

        let series = accel_series(window.samples());
        let energy = motion_energy(&series);
        let result = self.classifier.classify(&series);

        let nearest = result.nearest_neighbor();
        debug!(
            "ventana {} | mejor {} ({} votos) | vecino {} d={:.1} | energía {:.1}",
            self.windows,
            result.best_label(),
            result.best().votes,
            nearest.label,
            nearest.distance,
            energy
        );

        let event = self.engine.push(result.clone(), energy, now_ms);
        if !event.is_nothing() {
            info!("✅ Acción: {} @ {} ms", event.label, event.timestamp_ms);
            self.emit(&event);
        }

        let report = WindowReport {
            index: self.windows,
            result,
            energy,
            event,
        };
        self.windows += 1;
        Some(report)
    }

    fn emit(&mut self, event: &ActionEvent) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.emit(event) {
            warn!("⚠️  {}; no se enviarán más acciones", e);
            self.sink = None;
        }
    }

    /// Descarta la ventana en curso, el historial y los cooldowns
    pub fn reset(&mut self) {
        self.accumulator.clear();
        self.engine.reset();
        self.windows = 0;
        info!("🔄 Pipeline reiniciado");
    }

    pub fn windows_processed(&self) -> u64 {
        self.windows
    }

    pub fn classifier(&self) -> &KnnClassifier {
        &self.classifier
    }

    pub fn engine(&self) -> &GestureDecisionEngine {
        &self.engine
    }
}
