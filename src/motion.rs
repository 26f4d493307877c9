use crate::types::{Sample, Series, NUM_AXES};

/// Convierte una ventana de muestras a la serie de aceleración [3][n]
pub fn accel_series(samples: &[Sample]) -> Series {
    let mut series = vec![Vec::with_capacity(samples.len()); NUM_AXES];
    for sample in samples {
        for (axis, channel) in series.iter_mut().enumerate() {
            channel.push(sample.accel[axis]);
        }
    }
    series
}

/// Dispersión de un canal: `sqrt(Σ (x - μ)²)`.
///
/// No se divide por n; los umbrales de energía están calibrados así.
pub fn channel_spread(channel: &[f32]) -> f32 {
    if channel.is_empty() {
        return 0.0;
    }
    let mean = channel.iter().sum::<f32>() / channel.len() as f32;
    channel
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Energía de movimiento: media de la dispersión de cada canal
pub fn motion_energy(series: &[Vec<f32>]) -> f32 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().map(|c| channel_spread(c)).sum::<f32>() / series.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_series_layout() {
        let samples = vec![
            Sample::new(0, [1.0, 2.0, 3.0], [9.0; 3]),
            Sample::new(10, [4.0, 5.0, 6.0], [9.0; 3]),
        ];
        let series = accel_series(&samples);
        assert_eq!(series, vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);
    }

    #[test]
    fn test_static_window_has_no_energy() {
        let series = vec![vec![2000.0; 50]; 3];
        assert_eq!(motion_energy(&series), 0.0);
    }

    #[test]
    fn test_energy_is_mean_of_channels() {
        // [0, 2] -> media 1, desviaciones ±1 -> sqrt(2)
        let series = vec![vec![0.0, 2.0], vec![0.0, 0.0], vec![5.0, 5.0]];
        let expected = 2f32.sqrt() / 3.0;
        assert!((motion_energy(&series) - expected).abs() < 1e-6);
    }
}
