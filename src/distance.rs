//! Distancias entre series multi-eje (`series[canal][t]`).
//!
//! Todas las funciones son puras. Las series de un mismo par pueden tener
//! longitudes distintas salvo en la euclídea.

use crate::types::Series;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Mediana de un slice no vacío. Reordena el slice.
pub fn median(values: &mut [f32]) -> f32 {
    assert!(!values.is_empty(), "mediana de un slice vacío");
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2] + values[n / 2 - 1]) / 2.0
    } else {
        values[(n - 1) / 2]
    }
}

/// Filtro de mediana con ventana hacia delante: `out[i] = mediana(serie[i..i+winsize])`.
/// La ventana se recorta al final de la serie (sin wraparound).
pub fn median_filter_1d(serie: &[f32], winsize: usize) -> Vec<f32> {
    assert!(winsize > 0, "ventana de mediana nula");
    let mut scratch = Vec::with_capacity(winsize);
    (0..serie.len())
        .map(|i| {
            let to = (i + winsize).min(serie.len());
            scratch.clear();
            scratch.extend_from_slice(&serie[i..to]);
            median(&mut scratch)
        })
        .collect()
}

pub fn median_filter(series: &[Vec<f32>], winsize: usize) -> Series {
    series
        .iter()
        .map(|serie| median_filter_1d(serie, winsize))
        .collect()
}

#[inline]
fn min3(a: f32, b: f32, c: f32) -> f32 {
    a.min(b).min(c)
}

/// DTW clásico entre dos series 1-D con coste `|a[i] - b[j]|`.
///
/// La primera fila y la primera columna se inicializan con el coste
/// acumulado, así que `D[0][0] = coste(0, 0)`. Sólo se guardan dos filas.
pub fn dtw_distance(serie1: &[f32], serie2: &[f32]) -> f32 {
    assert!(
        !serie1.is_empty() && !serie2.is_empty(),
        "DTW sobre una serie vacía"
    );

    let m = serie2.len();
    let mut prev = vec![0.0f32; m];
    let mut curr = vec![0.0f32; m];

    prev[0] = (serie1[0] - serie2[0]).abs();
    for j in 1..m {
        prev[j] = prev[j - 1] + (serie1[0] - serie2[j]).abs();
    }

    for &a in &serie1[1..] {
        curr[0] = prev[0] + (a - serie2[0]).abs();
        for j in 1..m {
            let cost = (a - serie2[j]).abs();
            curr[j] = cost
                + min3(
                    prev[j],     // inserción
                    curr[j - 1], // borrado
                    prev[j - 1], // match
                );
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m - 1]
}

/// Suma de los DTW de cada canal por separado.
///
/// Cada canal tiene su propio camino de alineamiento; no es un DTW
/// multidimensional (ver [`dependent_dtw`]).
pub fn all_axis_dtw(s1: &[Vec<f32>], s2: &[Vec<f32>]) -> f32 {
    assert_eq!(s1.len(), s2.len(), "número de canales distinto");
    s1.iter()
        .zip(s2)
        .map(|(a, b)| dtw_distance(a, b))
        .sum()
}

/// Suma de las distancias euclídeas por canal. Exige series de igual longitud.
pub fn all_axis_euclidean(s1: &[Vec<f32>], s2: &[Vec<f32>]) -> f32 {
    assert_eq!(s1.len(), s2.len(), "número de canales distinto");
    s1.iter()
        .zip(s2)
        .map(|(a, b)| {
            assert_eq!(a.len(), b.len(), "euclídea sobre series de longitud distinta");
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        })
        .sum()
}

/// DTW con un único camino compartido por todos los canales.
/// Coste de la celda: suma de `|a[c][i] - b[c][j]|` sobre los canales.
pub fn dependent_dtw(s1: &[Vec<f32>], s2: &[Vec<f32>]) -> f32 {
    assert_eq!(s1.len(), s2.len(), "número de canales distinto");
    assert!(!s1.is_empty(), "serie sin canales");

    let n = s1[0].len();
    let m = s2[0].len();
    assert!(s1.iter().all(|c| c.len() == n), "canales de longitud desigual");
    assert!(s2.iter().all(|c| c.len() == m), "canales de longitud desigual");
    assert!(n > 0 && m > 0, "DTW sobre una serie vacía");

    let cost = |i: usize, j: usize| -> f32 {
        s1.iter()
            .zip(s2)
            .map(|(a, b)| (a[i] - b[j]).abs())
            .sum()
    };

    let mut prev = vec![0.0f32; m];
    let mut curr = vec![0.0f32; m];
    prev[0] = cost(0, 0);
    for j in 1..m {
        prev[j] = prev[j - 1] + cost(0, j);
    }
    for i in 1..n {
        curr[0] = prev[0] + cost(i, 0);
        for j in 1..m {
            curr[j] = cost(i, j) + min3(prev[j], curr[j - 1], prev[j - 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m - 1]
}

/// Algoritmo de distancia entre series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    /// DTW independiente por canal, sumado
    #[default]
    AllAxisDtw,
    /// Euclídea por canal, sumada (sólo series de igual longitud)
    AllAxisEuclidean,
    /// DTW con camino compartido entre canales
    DependentDtw,
}

/// Distancia configurada: algoritmo + filtro de mediana opcional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceMetric {
    pub kind: DistanceKind,
    pub median_window: Option<usize>,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self {
            kind: DistanceKind::AllAxisDtw,
            median_window: Some(crate::types::DEFAULT_MEDIAN_WINDOW),
        }
    }
}

impl DistanceMetric {
    pub fn new(kind: DistanceKind, median_window: Option<usize>) -> Self {
        Self {
            kind,
            median_window,
        }
    }

    /// Aplica el pre-filtrado (si lo hay). Sin filtro no se copia la serie.
    pub fn prepare<'a>(&self, series: &'a [Vec<f32>]) -> Cow<'a, [Vec<f32>]> {
        match self.median_window {
            Some(winsize) => Cow::Owned(median_filter(series, winsize)),
            None => Cow::Borrowed(series),
        }
    }

    /// Distancia entre dos series ya preparadas con [`DistanceMetric::prepare`]
    pub fn distance_prepared(&self, s1: &[Vec<f32>], s2: &[Vec<f32>]) -> f32 {
        match self.kind {
            DistanceKind::AllAxisDtw => all_axis_dtw(s1, s2),
            DistanceKind::AllAxisEuclidean => all_axis_euclidean(s1, s2),
            DistanceKind::DependentDtw => dependent_dtw(s1, s2),
        }
    }

    pub fn distance(&self, s1: &[Vec<f32>], s2: &[Vec<f32>]) -> f32 {
        self.distance_prepared(&self.prepare(s1), &self.prepare(s2))
    }
}
