use crate::distance::{DistanceKind, DistanceMetric};
use crate::templates::TemplateLibrary;
use crate::types::{ActionCommand, Series, NUM_AXES};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("k debe ser > 0")]
    ZeroK,

    #[error("El tamaño de ventana debe ser > 0")]
    ZeroWindow,

    #[error("Distancia euclídea: la plantilla {index} mide {actual}, la ventana {expected}")]
    TemplateLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Uno de los k vecinos más cercanos
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    /// Índice de la plantilla en la biblioteca
    pub template: usize,
    pub label: ActionCommand,
}

/// Votos y distancia media de una etiqueta
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStats {
    pub label: ActionCommand,
    pub votes: usize,
    /// Plantillas de la etiqueta en la biblioteca
    pub templates: usize,
    /// Media de las distancias a TODAS las plantillas de la etiqueta,
    /// no sólo a las que están entre los k vecinos
    pub mean_distance: f32,
    /// Distancia de su vecino más cercano entre los k, si tiene alguno
    pub nearest_distance: Option<f32>,
}

/// Resultado de clasificar una ventana
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Todas las etiquetas de la biblioteca, por votos descendentes.
    /// Los empates conservan el orden de primera aparición en la biblioteca.
    pub ranking: Vec<LabelStats>,
    /// Los k vecinos más cercanos por distancia ascendente
    pub nearest: Vec<Neighbor>,
    /// k pedido antes de recortarlo al tamaño de la biblioteca
    pub requested_k: usize,
}

impl ClassificationResult {
    /// Etiqueta más votada
    pub fn best_label(&self) -> ActionCommand {
        self.ranking[0].label
    }

    pub fn best(&self) -> &LabelStats {
        &self.ranking[0]
    }

    pub fn nearest_neighbor(&self) -> &Neighbor {
        &self.nearest[0]
    }

    /// k efectivo (ya recortado al número de plantillas)
    pub fn k(&self) -> usize {
        self.nearest.len()
    }

    /// Se pidieron más vecinos de los que hay plantillas
    pub fn is_clamped(&self) -> bool {
        self.requested_k > self.nearest.len()
    }

    pub fn votes(&self, label: ActionCommand) -> usize {
        self.stats(label).map_or(0, |s| s.votes)
    }

    pub fn stats(&self, label: ActionCommand) -> Option<&LabelStats> {
        self.ranking.iter().find(|s| s.label == label)
    }
}

/// Clasificador k-NN sobre una biblioteca de plantillas compartida
pub struct KnnClassifier {
    library: Arc<TemplateLibrary>,
    metric: DistanceMetric,
    k: usize,
    requested_k: usize,
    window_size: usize,
    /// Plantillas ya pre-filtradas con la métrica
    prepared: Vec<Series>,
}

impl KnnClassifier {
    pub fn new(
        library: Arc<TemplateLibrary>,
        k: usize,
        metric: DistanceMetric,
        window_size: usize,
    ) -> Result<Self, ClassifierError> {
        if k == 0 {
            return Err(ClassifierError::ZeroK);
        }
        if window_size == 0 {
            return Err(ClassifierError::ZeroWindow);
        }

        if metric.kind == DistanceKind::AllAxisEuclidean {
            if let Some((index, t)) = library
                .templates()
                .iter()
                .enumerate()
                .find(|(_, t)| t.len() != window_size)
            {
                return Err(ClassifierError::TemplateLength {
                    index,
                    expected: window_size,
                    actual: t.len(),
                });
            }
        }

        let requested_k = k;
        let k = if k > library.len() {
            warn!(
                "k={} mayor que el número de plantillas ({}), se usa k={}",
                k,
                library.len(),
                library.len()
            );
            library.len()
        } else {
            k
        };

        let prepared = library
            .templates()
            .iter()
            .map(|t| metric.prepare(&t.accel).into_owned())
            .collect();

        Ok(Self {
            library,
            metric,
            k,
            requested_k,
            window_size,
            prepared,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn library(&self) -> &Arc<TemplateLibrary> {
        &self.library
    }

    /// Clasifica una ventana de aceleración `[3][window_size]`.
    ///
    /// Una ventana con otra forma es un fallo del acumulador y provoca pánico.
    pub fn classify(&self, window: &[Vec<f32>]) -> ClassificationResult {
        assert_eq!(window.len(), NUM_AXES, "ventana con número de ejes incorrecto");
        assert!(
            window.iter().all(|c| c.len() == self.window_size),
            "ventana de longitud distinta a {}",
            self.window_size
        );

        let window = self.metric.prepare(window);
        let distances: Vec<f32> = self
            .prepared
            .par_iter()
            .map(|t| self.metric.distance_prepared(&window, t))
            .collect();

        rank_neighbors(self.k, self.requested_k, &distances, &self.library)
    }
}

/// k-NN sin estado: prepara las plantillas en cada llamada.
/// `k` mayor que el número de plantillas se recorta.
pub fn classify(
    k: usize,
    window: &[Vec<f32>],
    library: &TemplateLibrary,
    metric: &DistanceMetric,
) -> Result<ClassificationResult, ClassifierError> {
    if k == 0 {
        return Err(ClassifierError::ZeroK);
    }
    let window = metric.prepare(window);
    let distances: Vec<f32> = library
        .templates()
        .par_iter()
        .map(|t| metric.distance_prepared(&window, &metric.prepare(&t.accel)))
        .collect();

    Ok(rank_neighbors(k.min(library.len()), k, &distances, library))
}

/// Ordena las plantillas por distancia, vota con las k primeras y calcula
/// las estadísticas por etiqueta. `distances[i]` corresponde a la plantilla i.
fn rank_neighbors(
    k: usize,
    requested_k: usize,
    distances: &[f32],
    library: &TemplateLibrary,
) -> ClassificationResult {
    assert!(!library.is_empty(), "clasificación con biblioteca vacía");
    assert_eq!(distances.len(), library.len());

    let templates = library.templates();

    // Desempate por orden de inserción: la distancia sola no es un orden total fiable
    let mut order: Vec<usize> = (0..distances.len()).collect();
    order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(a.cmp(&b)));

    let nearest: Vec<Neighbor> = order
        .iter()
        .take(k)
        .map(|&i| Neighbor {
            distance: distances[i],
            template: i,
            label: templates[i].label,
        })
        .collect();

    let mut ranking: Vec<LabelStats> = library
        .labels()
        .iter()
        .map(|&label| {
            let (sum, count) = templates
                .iter()
                .zip(distances)
                .filter(|(t, _)| t.label == label)
                .fold((0.0f32, 0usize), |(s, c), (_, d)| (s + d, c + 1));
            LabelStats {
                label,
                votes: nearest.iter().filter(|n| n.label == label).count(),
                templates: count,
                mean_distance: sum / count as f32,
                nearest_distance: nearest.iter().find(|n| n.label == label).map(|n| n.distance),
            }
        })
        .collect();

    // sort_by es estable: los empates quedan en orden de aparición
    ranking.sort_by(|a, b| b.votes.cmp(&a.votes));

    ClassificationResult {
        ranking,
        nearest,
        requested_k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::GestureTemplate;

    fn ramp(len: usize, to: f32) -> Series {
        let step = to / (len - 1) as f32;
        vec![
            (0..len).map(|i| i as f32 * step).collect(),
            vec![0.0; len],
            vec![0.0; len],
        ]
    }

    fn flat(value: f32, len: usize) -> Series {
        vec![vec![value; len]; 3]
    }

    fn library(templates: Vec<GestureTemplate>) -> Arc<TemplateLibrary> {
        Arc::new(TemplateLibrary::new(templates).unwrap())
    }

    fn raw_dtw() -> DistanceMetric {
        DistanceMetric::new(DistanceKind::AllAxisDtw, None)
    }

    #[test]
    fn test_rejects_zero_k() {
        let lib = library(vec![GestureTemplate::new(ActionCommand::Land, flat(0.0, 4))]);
        assert_eq!(
            KnnClassifier::new(lib, 0, raw_dtw(), 4).err(),
            Some(ClassifierError::ZeroK)
        );
    }

    #[test]
    fn test_ramp_is_closest_to_forward() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::GoForward, ramp(50, 100.0)),
            GestureTemplate::new(ActionCommand::Nothing, flat(0.0, 50)),
        ]);
        let knn = KnnClassifier::new(lib, 1, DistanceMetric::default(), 50).unwrap();

        let result = knn.classify(&ramp(50, 98.0));
        assert_eq!(result.best_label(), ActionCommand::GoForward);
        assert_eq!(result.nearest_neighbor().label, ActionCommand::GoForward);
        assert_eq!(result.votes(ActionCommand::GoForward), 1);
        assert_eq!(result.votes(ActionCommand::Nothing), 0);
        assert_eq!(result.ranking.len(), 2);
    }

    #[test]
    fn test_k_larger_than_library_is_clamped() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::GoLeft, flat(1.0, 8)),
            GestureTemplate::new(ActionCommand::GoRight, flat(5.0, 10)),
            GestureTemplate::new(ActionCommand::GoLeft, flat(2.0, 6)),
        ]);
        let knn = KnnClassifier::new(lib, 5, raw_dtw(), 8).unwrap();
        assert_eq!(knn.k(), 3);

        let result = knn.classify(&flat(0.0, 8));
        assert_eq!(result.k(), 3);
        assert!(result.is_clamped());
        let total: usize = result.ranking.iter().map(|s| s.votes).sum();
        assert_eq!(total, 3);
        // Con k >= plantillas, votos = plantillas por etiqueta
        assert_eq!(result.votes(ActionCommand::GoLeft), 2);
        assert_eq!(result.votes(ActionCommand::GoRight), 1);
    }

    #[test]
    fn test_votes_sum_to_k_and_cover_all_labels() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::Land, flat(0.0, 6)),
            GestureTemplate::new(ActionCommand::Land, flat(0.5, 6)),
            GestureTemplate::new(ActionCommand::Hover, flat(10.0, 6)),
            GestureTemplate::new(ActionCommand::Takeoff, flat(20.0, 6)),
        ]);
        let knn = KnnClassifier::new(lib, 2, raw_dtw(), 6).unwrap();
        let result = knn.classify(&flat(0.0, 6));

        assert_eq!(result.ranking.iter().map(|s| s.votes).sum::<usize>(), 2);
        assert_eq!(result.ranking.len(), 3);
        assert_eq!(result.best_label(), ActionCommand::Land);
        assert_eq!(result.votes(ActionCommand::Takeoff), 0);
        // Sin votos, pero con distancia definida
        let takeoff = result.stats(ActionCommand::Takeoff).unwrap();
        assert_eq!(takeoff.mean_distance, 3.0 * 20.0 * 6.0);
        assert_eq!(takeoff.nearest_distance, None);
        assert_eq!(takeoff.templates, 1);

        let land = result.stats(ActionCommand::Land).unwrap();
        assert_eq!(land.templates, 2);
        assert_eq!(land.nearest_distance, Some(0.0));
    }

    #[test]
    fn test_mean_distance_uses_every_template_of_label() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::Land, flat(1.0, 4)),
            GestureTemplate::new(ActionCommand::Land, flat(3.0, 4)),
        ]);
        let knn = KnnClassifier::new(lib, 1, raw_dtw(), 4).unwrap();
        let result = knn.classify(&flat(0.0, 4));

        // 3 ejes * 4 muestras * {1, 3} -> {12, 36}
        assert_eq!(result.nearest.len(), 1);
        assert_eq!(result.nearest_neighbor().distance, 12.0);
        assert_eq!(result.best().mean_distance, 24.0);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::GoRight, flat(1.0, 4)),
            GestureTemplate::new(ActionCommand::GoLeft, flat(-1.0, 4)),
        ]);
        let knn = KnnClassifier::new(lib, 2, raw_dtw(), 4).unwrap();
        let result = knn.classify(&flat(0.0, 4));

        // Misma distancia y mismos votos: gana la primera insertada
        assert_eq!(result.nearest[0].template, 0);
        assert_eq!(result.nearest[1].template, 1);
        assert_eq!(result.best_label(), ActionCommand::GoRight);
        assert_eq!(result.ranking[1].label, ActionCommand::GoLeft);
    }

    #[test]
    fn test_euclidean_requires_window_length() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::Land, flat(0.0, 4)),
            GestureTemplate::new(ActionCommand::Land, flat(0.0, 5)),
        ]);
        let metric = DistanceMetric::new(DistanceKind::AllAxisEuclidean, None);
        assert_eq!(
            KnnClassifier::new(lib, 1, metric, 4).err(),
            Some(ClassifierError::TemplateLength {
                index: 1,
                expected: 4,
                actual: 5
            })
        );
    }

    #[test]
    #[should_panic]
    fn test_wrong_window_shape_panics() {
        let lib = library(vec![GestureTemplate::new(ActionCommand::Land, flat(0.0, 4))]);
        let knn = KnnClassifier::new(lib, 1, raw_dtw(), 4).unwrap();
        knn.classify(&flat(0.0, 5));
    }

    #[test]
    fn test_free_classify_matches_classifier() {
        let lib = library(vec![
            GestureTemplate::new(ActionCommand::GoForward, ramp(20, 50.0)),
            GestureTemplate::new(ActionCommand::GoBackward, ramp(20, -50.0)),
            GestureTemplate::new(ActionCommand::Nothing, flat(0.0, 20)),
        ]);
        let metric = DistanceMetric::default();
        let knn = KnnClassifier::new(Arc::clone(&lib), 3, metric, 20).unwrap();
        let window = ramp(20, 45.0);

        assert_eq!(
            classify(3, &window, &lib, &metric).unwrap(),
            knn.classify(&window)
        );
        assert_eq!(classify(0, &window, &lib, &metric), Err(ClassifierError::ZeroK));
    }
}
