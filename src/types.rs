use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Muestra del sensor: instante (ms) + acelerómetro [x, y, z] + giroscopio [x, y, z]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub accel: [f32; 3],
    /// El giroscopio viaja con la muestra pero la distancia no lo usa
    pub gyro: [f32; 3],
}

impl Sample {
    pub fn new(timestamp_ms: u64, accel: [f32; 3], gyro: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            accel,
            gyro,
        }
    }
}

/// Serie temporal multi-eje: `series[canal][t]`
pub type Series = Vec<Vec<f32>>;

/// Constantes del sistema
pub const NUM_AXES: usize = 3; // ax, ay, az
pub const DEFAULT_WINDOW_SIZE: usize = 150;
pub const DEFAULT_STEP: usize = 15;
pub const DEFAULT_KNN_K: usize = 3;
pub const DEFAULT_MEDIAN_WINDOW: usize = 10;

/// Acción que puede recibir el dron. `Nothing` es la no-acción.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionCommand {
    Speed,
    Takeoff,
    Land,
    Hover,
    GoTop,
    GoDown,
    GoForward,
    GoBackward,
    GoLeft,
    GoRight,
    RotateLeft,
    RotateRight,
    ChangeVideo,
    Nothing,
}

impl ActionCommand {
    pub const ALL: [ActionCommand; 14] = [
        ActionCommand::Speed,
        ActionCommand::Takeoff,
        ActionCommand::Land,
        ActionCommand::Hover,
        ActionCommand::GoTop,
        ActionCommand::GoDown,
        ActionCommand::GoForward,
        ActionCommand::GoBackward,
        ActionCommand::GoLeft,
        ActionCommand::GoRight,
        ActionCommand::RotateLeft,
        ActionCommand::RotateRight,
        ActionCommand::ChangeVideo,
        ActionCommand::Nothing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "SPEED",
            Self::Takeoff => "TAKEOFF",
            Self::Land => "LAND",
            Self::Hover => "HOVER",
            Self::GoTop => "GOTOP",
            Self::GoDown => "GODOWN",
            Self::GoForward => "GOFORWARD",
            Self::GoBackward => "GOBACKWARD",
            Self::GoLeft => "GOLEFT",
            Self::GoRight => "GORIGHT",
            Self::RotateLeft => "ROTATELEFT",
            Self::RotateRight => "ROTATERIGHT",
            Self::ChangeVideo => "CHANGEVIDEO",
            Self::Nothing => "NOTHING",
        }
    }

    pub fn is_nothing(&self) -> bool {
        *self == ActionCommand::Nothing
    }
}

impl fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Acción desconocida: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionCommand {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ActionCommand::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownAction(wanted.to_string()))
    }
}

/// Decisión emitida por el motor de decisión, una por ventana.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionEvent {
    pub label: ActionCommand,
    /// Instante (ms del flujo de muestras) en que se tomó la decisión
    pub timestamp_ms: u64,
    /// Si es `Some`, el actuador mantiene la acción activa durante ese tiempo.
    /// Si es `None`, la acción dura mientras siga detectándose.
    pub hold: Option<Duration>,
}

impl ActionEvent {
    pub fn nothing(timestamp_ms: u64) -> Self {
        Self {
            label: ActionCommand::Nothing,
            timestamp_ms,
            hold: None,
        }
    }

    pub fn is_nothing(&self) -> bool {
        self.label.is_nothing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_parse_back() {
        for action in ActionCommand::ALL {
            assert_eq!(action.as_str().parse::<ActionCommand>(), Ok(action));
        }
        assert_eq!("goforward".parse::<ActionCommand>(), Ok(ActionCommand::GoForward));
        assert!("FLIP".parse::<ActionCommand>().is_err());
    }

    #[test]
    fn test_serde_uses_uppercase_names() {
        let json = serde_json::to_string(&ActionCommand::RotateLeft).unwrap();
        assert_eq!(json, "\"ROTATELEFT\"");
        let back: ActionCommand = serde_json::from_str("\"GOTOP\"").unwrap();
        assert_eq!(back, ActionCommand::GoTop);
    }
}
