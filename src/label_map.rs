use crate::types::{ActionCommand, UnknownAction};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelMapError {
    #[error("Entrada de movements_map mal formada: {0:?} (se espera '<n>:<ACCION>')")]
    BadEntry(String),

    #[error("Número de comando inválido: {0:?}")]
    BadCommand(String),

    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),

    #[error("Comando {0} repetido en movements_map")]
    Duplicate(u32),

    #[error("movements_map vacío")]
    Empty,

    #[error("El comando {0} de las plantillas no está en movements_map")]
    UnknownCommand(u32),
}

/// `movements_map` tal como aparece en la configuración: o bien la cadena
/// `"1:GOFORWARD,2:GOBACKWARD"`, o bien un objeto `{"1": "GOFORWARD"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MovementsMap {
    Inline(String),
    Table(BTreeMap<String, String>),
}

/// Traducción número de comando (ficheros de plantillas) -> acción
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    map: BTreeMap<u32, ActionCommand>,
}

impl LabelMap {
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, LabelMapError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = BTreeMap::new();
        for (command, action) in pairs {
            let command_id: u32 = command
                .trim()
                .parse()
                .map_err(|_| LabelMapError::BadCommand(command.to_string()))?;
            let action: ActionCommand = action.parse()?;
            if map.insert(command_id, action).is_some() {
                return Err(LabelMapError::Duplicate(command_id));
            }
        }

        if map.is_empty() {
            return Err(LabelMapError::Empty);
        }
        Ok(Self { map })
    }

    /// Formato de propiedades: `"1:GOFORWARD,2:GOBACKWARD"`
    pub fn parse(spec: &str) -> Result<Self, LabelMapError> {
        let mut pairs = Vec::new();
        for entry in spec.split(',').filter(|e| !e.trim().is_empty()) {
            let (command, action) = entry
                .split_once(':')
                .ok_or_else(|| LabelMapError::BadEntry(entry.to_string()))?;
            pairs.push((command, action));
        }
        Self::from_pairs(pairs)
    }

    pub fn from_movements(movements: &MovementsMap) -> Result<Self, LabelMapError> {
        match movements {
            MovementsMap::Inline(spec) => Self::parse(spec),
            MovementsMap::Table(table) => {
                Self::from_pairs(table.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
        }
    }

    pub fn resolve(&self, command: u32) -> Result<ActionCommand, LabelMapError> {
        self.map
            .get(&command)
            .copied()
            .ok_or(LabelMapError::UnknownCommand(command))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
