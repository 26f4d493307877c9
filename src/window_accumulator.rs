use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccumulatorError {
    #[error("El tamaño de ventana debe ser > 0")]
    ZeroWindow,

    #[error("El paso debe ser > 0")]
    ZeroStep,

    #[error("Paso {step} mayor que la ventana {window_size}")]
    StepTooLarge { window_size: usize, step: usize },
}

/// Ventana completa de `window_size` elementos en orden de llegada.
#[derive(Debug, Clone, PartialEq)]
pub struct Window<T> {
    samples: Vec<T>,
}

impl<T> Window<T> {
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.samples.last()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.samples
    }
}

/// Buffer FIFO que produce ventanas deslizantes de `window_size` muestras
/// avanzando `step` muestras entre ventanas consecutivas.
pub struct WindowAccumulator<T> {
    buffer: VecDeque<T>,
    window_size: usize,
    step: usize,
}

impl<T: Clone> WindowAccumulator<T> {
    pub fn new(window_size: usize, step: usize) -> Result<Self, AccumulatorError> {
        if window_size == 0 {
            return Err(AccumulatorError::ZeroWindow);
        }
        if step == 0 {
            return Err(AccumulatorError::ZeroStep);
        }
        if step > window_size {
            return Err(AccumulatorError::StepTooLarge { window_size, step });
        }

        Ok(Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size,
            step,
        })
    }

    /// Añade una muestra. Devuelve la ventana si esta muestra la completa.
    pub fn add(&mut self, sample: T) -> Option<Window<T>> {
        assert!(
            self.buffer.len() < self.window_size,
            "buffer de ventana desbordado ({} >= {})",
            self.buffer.len(),
            self.window_size
        );

        self.buffer.push_back(sample);
        if self.buffer.len() < self.window_size {
            return None;
        }

        let window = Window {
            samples: self.buffer.iter().cloned().collect(),
        };

        // Deslizar: descartar las `step` muestras más antiguas
        self.buffer.drain(..self.step);

        Some(window)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Número de muestras acumuladas para la próxima ventana
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Limpia el buffer (p. ej. tras una reconexión del sensor)
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
