//! Motor de decisión: convierte los votos ruidosos de cada ventana en
//! acciones discretas, con anti-rebote y tiempo mínimo entre repeticiones.

use crate::classifier::ClassificationResult;
use crate::types::{ActionCommand, ActionEvent};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("El historial de decisión debe tener al menos 1 entrada")]
    ZeroHistory,
}

/// Mínimo de vecinos que deben coincidir: ceil(2k/3)
pub fn quorum(k: usize) -> usize {
    (2 * k).div_ceil(3)
}

/// Filtros que debe pasar una ventana para proponer una etiqueta
#[derive(Debug, Clone, PartialEq)]
pub struct Gates {
    /// Energía de movimiento mínima
    pub energy_threshold: f32,
    /// La energía debe superar el umbral; sin esto basta con igualarlo
    pub strict_energy: bool,
    /// Distancia máxima (exclusiva) del vecino más cercano
    pub nearest_distance_threshold: f32,
    /// Etiquetas que no pasan por el filtro de energía (posturas estáticas)
    pub energy_exempt: Vec<ActionCommand>,
    /// Exigir ceil(2k/3) votos para la etiqueta ganadora. Si k se recortó
    /// al tamaño de la biblioteca, nunca más que sus plantillas.
    pub check_quorum: bool,
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            energy_threshold: 2000.0,
            strict_energy: false,
            nearest_distance_threshold: 100_000.0,
            energy_exempt: Vec::new(),
            check_quorum: true,
        }
    }
}

/// Resultado de aplicar los filtros a una ventana
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateVerdict {
    Pass(ActionCommand),
    LowEnergy(f32),
    NearestDisagrees {
        best: ActionCommand,
        nearest: ActionCommand,
    },
    TooFar(f32),
    NoQuorum {
        votes: usize,
        needed: usize,
    },
}

impl GateVerdict {
    pub fn label(&self) -> Option<ActionCommand> {
        match self {
            GateVerdict::Pass(label) => Some(*label),
            _ => None,
        }
    }
}

impl Gates {
    pub fn evaluate(&self, result: &ClassificationResult, energy: f32) -> GateVerdict {
        let best = result.best();

        let low_energy = if self.strict_energy {
            energy <= self.energy_threshold
        } else {
            energy < self.energy_threshold
        };
        if low_energy && !self.energy_exempt.contains(&best.label) {
            return GateVerdict::LowEnergy(energy);
        }

        let nearest = result.nearest_neighbor();
        if nearest.label != best.label {
            return GateVerdict::NearestDisagrees {
                best: best.label,
                nearest: nearest.label,
            };
        }

        if nearest.distance >= self.nearest_distance_threshold {
            return GateVerdict::TooFar(nearest.distance);
        }

        let needed = if result.is_clamped() {
            quorum(result.k()).min(best.templates.max(1))
        } else {
            quorum(result.k())
        };
        if self.check_quorum && best.votes < needed {
            return GateVerdict::NoQuorum {
                votes: best.votes,
                needed,
            };
        }

        GateVerdict::Pass(best.label)
    }
}

/// Una sola ventana decide; sin historial ni quórum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    pub energy_threshold: f32,
    pub nearest_distance_threshold: f32,
    pub cooldown_ms: u64,
    pub hold_ms: u64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            energy_threshold: 25.0,
            nearest_distance_threshold: 125.0,
            cooldown_ms: 0,
            hold_ms: 800,
        }
    }
}

/// Las últimas `history_size` ventanas deben pasar los filtros y coincidir
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalParams {
    pub history_size: usize,
    pub energy_threshold: f32,
    pub nearest_distance_threshold: f32,
    pub energy_exempt: Vec<ActionCommand>,
    pub cooldown_ms: u64,
    pub hold_ms: u64,
}

impl Default for HistoricalParams {
    fn default() -> Self {
        Self {
            history_size: 2,
            energy_threshold: 2000.0,
            nearest_distance_threshold: 100_000.0,
            energy_exempt: Vec::new(),
            cooldown_ms: 2000,
            hold_ms: 800,
        }
    }
}

/// Gestos que se repiten: la acción dura mientras se detecte.
/// Cambiar a OTRA acción exige `inter_action_delay_ms` desde la última.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepetitiveParams {
    pub energy_threshold: f32,
    pub nearest_distance_threshold: f32,
    pub energy_exempt: Vec<ActionCommand>,
    pub inter_action_delay_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for RepetitiveParams {
    fn default() -> Self {
        Self {
            energy_threshold: 2000.0,
            nearest_distance_threshold: 100_000.0,
            energy_exempt: vec![ActionCommand::GoTop, ActionCommand::GoDown],
            inter_action_delay_ms: 1000,
            cooldown_ms: 0,
        }
    }
}

/// Estrategia de decisión, elegida por configuración
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DecisionPolicy {
    Threshold(ThresholdParams),
    Historical(HistoricalParams),
    Repetitive(RepetitiveParams),
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        DecisionPolicy::Historical(HistoricalParams::default())
    }
}

impl DecisionPolicy {
    pub fn gates(&self) -> Gates {
        match self {
            DecisionPolicy::Threshold(p) => Gates {
                energy_threshold: p.energy_threshold,
                strict_energy: true,
                nearest_distance_threshold: p.nearest_distance_threshold,
                energy_exempt: Vec::new(),
                check_quorum: false,
            },
            DecisionPolicy::Historical(p) => Gates {
                energy_threshold: p.energy_threshold,
                strict_energy: false,
                nearest_distance_threshold: p.nearest_distance_threshold,
                energy_exempt: p.energy_exempt.clone(),
                check_quorum: true,
            },
            DecisionPolicy::Repetitive(p) => Gates {
                energy_threshold: p.energy_threshold,
                strict_energy: false,
                nearest_distance_threshold: p.nearest_distance_threshold,
                energy_exempt: p.energy_exempt.clone(),
                check_quorum: true,
            },
        }
    }

    /// Entradas de historial que necesita la estrategia
    pub fn history_size(&self) -> usize {
        match self {
            DecisionPolicy::Historical(p) => p.history_size,
            _ => 1,
        }
    }

    pub fn cooldown(&self) -> u64 {
        match self {
            DecisionPolicy::Threshold(p) => p.cooldown_ms,
            DecisionPolicy::Historical(p) => p.cooldown_ms,
            DecisionPolicy::Repetitive(p) => p.cooldown_ms,
        }
    }

    /// Duración fija de la acción, si la estrategia la define
    pub fn hold(&self) -> Option<Duration> {
        match self {
            DecisionPolicy::Threshold(p) => Some(Duration::from_millis(p.hold_ms)),
            DecisionPolicy::Historical(p) => Some(Duration::from_millis(p.hold_ms)),
            DecisionPolicy::Repetitive(_) => None,
        }
    }
}

/// Entrada del historial: votos de una ventana + su energía
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub result: ClassificationResult,
    pub energy: f32,
}

pub struct GestureDecisionEngine {
    policy: DecisionPolicy,
    gates: Gates,
    history: VecDeque<HistoryEntry>,
    /// Último instante (ms) en que se emitió cada acción
    last_fired: HashMap<ActionCommand, u64>,
    /// Última acción emitida, para el retardo entre acciones distintas
    last_action: Option<(ActionCommand, u64)>,
}

impl GestureDecisionEngine {
    pub fn new(policy: DecisionPolicy) -> Result<Self, DecisionError> {
        let capacity = policy.history_size();
        if capacity == 0 {
            return Err(DecisionError::ZeroHistory);
        }

        Ok(Self {
            gates: policy.gates(),
            policy,
            history: VecDeque::with_capacity(capacity + 1),
            last_fired: HashMap::new(),
            last_action: None,
        })
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Añade los votos de una ventana y decide. `now_ms` es el instante de la
    /// última muestra de la ventana.
    pub fn push(
        &mut self,
        result: ClassificationResult,
        energy: f32,
        now_ms: u64,
    ) -> ActionEvent {
        self.history.push_back(HistoryEntry { result, energy });
        while self.history.len() > self.policy.history_size() {
            self.history.pop_front();
        }
        self.decide(now_ms)
    }

    pub fn decide(&mut self, now_ms: u64) -> ActionEvent {
        let Some(label) = self.candidate() else {
            return ActionEvent::nothing(now_ms);
        };
        if label.is_nothing() {
            return ActionEvent::nothing(now_ms);
        }

        if let Some(&fired_at) = self.last_fired.get(&label) {
            if now_ms.saturating_sub(fired_at) < self.policy.cooldown() {
                debug!("{} bloqueado por cooldown", label);
                return ActionEvent::nothing(now_ms);
            }
        }

        if let DecisionPolicy::Repetitive(params) = &self.policy {
            if let Some((previous, at)) = self.last_action {
                if previous != label
                    && now_ms.saturating_sub(at) <= params.inter_action_delay_ms
                {
                    debug!(
                        "{} bloqueado: {} hace menos de {} ms",
                        label, previous, params.inter_action_delay_ms
                    );
                    return ActionEvent::nothing(now_ms);
                }
            }
        }

        self.last_fired.insert(label, now_ms);
        self.last_action = Some((label, now_ms));

        ActionEvent {
            label,
            timestamp_ms: now_ms,
            hold: self.policy.hold(),
        }
    }

    /// Etiqueta propuesta por el historial actual, antes del cooldown
    fn candidate(&self) -> Option<ActionCommand> {
        let gates = &self.gates;

        match &self.policy {
            DecisionPolicy::Historical(params) => {
                if self.history.len() < params.history_size {
                    return None;
                }

                let mut agreed: Option<ActionCommand> = None;
                for entry in &self.history {
                    let verdict = gates.evaluate(&entry.result, entry.energy);
                    let label = match verdict.label() {
                        Some(label) => label,
                        None => {
                            debug!("ventana descartada: {:?}", verdict);
                            return None;
                        }
                    };
                    if agreed.is_some_and(|prev| prev != label) {
                        return None;
                    }
                    agreed = Some(label);
                }
                agreed
            }
            DecisionPolicy::Threshold(_) | DecisionPolicy::Repetitive(_) => {
                let entry = self.history.back()?;
                let verdict = gates.evaluate(&entry.result, entry.energy);
                if verdict.label().is_none() {
                    debug!("ventana descartada: {:?}", verdict);
                }
                verdict.label()
            }
        }
    }

    /// Entradas acumuladas (nunca más que `history_size`)
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn is_ready(&self) -> bool {
        self.history.len() >= self.policy.history_size()
    }

    /// Olvida el historial y los cooldowns (p. ej. tras reconectar el sensor)
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_fired.clear();
        self.last_action = None;
    }
}
