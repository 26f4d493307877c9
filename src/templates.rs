use crate::label_map::{LabelMap, LabelMapError};
use crate::template_reader::{read_templates_file, RawGesture, TemplateError};
use crate::types::{ActionCommand, Series, NUM_AXES};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Label(#[from] LabelMapError),

    #[error("La biblioteca de plantillas está vacía")]
    Empty,

    #[error("Plantilla {index} ({label}): se esperaban 3 ejes de igual longitud no nula")]
    BadShape { index: usize, label: ActionCommand },
}

/// Gesto de referencia etiquetado con su acción
#[derive(Debug, Clone, PartialEq)]
pub struct GestureTemplate {
    pub label: ActionCommand,
    /// Número de comando y de muestra en el fichero de origen
    pub command: u32,
    pub sample: u32,
    pub accel: Series,
    pub gyro: Series,
}

impl GestureTemplate {
    pub fn new(label: ActionCommand, accel: Series) -> Self {
        Self {
            label,
            command: 0,
            sample: 0,
            gyro: vec![Vec::new(); accel.len()],
            accel,
        }
    }

    pub fn len(&self) -> usize {
        self.accel.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Conjunto inmutable de plantillas, agrupadas por acción.
///
/// Conserva el orden de inserción de las plantillas y el orden de primera
/// aparición de cada etiqueta; el clasificador desempata con ambos.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: Vec<GestureTemplate>,
    labels: Vec<ActionCommand>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<GestureTemplate>) -> Result<Self, LibraryError> {
        if templates.is_empty() {
            return Err(LibraryError::Empty);
        }

        let mut labels = Vec::new();
        for (index, template) in templates.iter().enumerate() {
            let len = template.len();
            if template.accel.len() != NUM_AXES
                || len == 0
                || template.accel.iter().any(|c| c.len() != len)
            {
                return Err(LibraryError::BadShape {
                    index,
                    label: template.label,
                });
            }
            if !labels.contains(&template.label) {
                labels.push(template.label);
            }
        }

        Ok(Self { templates, labels })
    }

    /// Etiqueta cada gesto grabado con `label_map`. Un comando sin traducción
    /// es un error aquí, no durante la clasificación.
    pub fn from_raw(raw: Vec<RawGesture>, label_map: &LabelMap) -> Result<Self, LibraryError> {
        let templates = raw
            .into_iter()
            .map(|g| -> Result<GestureTemplate, LibraryError> {
                Ok(GestureTemplate {
                    label: label_map.resolve(g.command)?,
                    command: g.command,
                    sample: g.sample,
                    accel: g.accel,
                    gyro: g.gyro,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(templates)
    }

    pub fn load(path: impl AsRef<Path>, label_map: &LabelMap) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let library = Self::from_raw(read_templates_file(path)?, label_map)?;

        info!(
            "📚 {} plantillas cargadas desde {}",
            library.len(),
            path.display()
        );
        for label in library.labels() {
            info!("   {:<12} : {}", label, library.count(*label));
        }
        Ok(library)
    }

    pub fn templates(&self) -> &[GestureTemplate] {
        &self.templates
    }

    /// Etiquetas en orden de primera aparición
    pub fn labels(&self) -> &[ActionCommand] {
        &self.labels
    }

    pub fn by_label(&self, label: ActionCommand) -> impl Iterator<Item = &GestureTemplate> {
        self.templates.iter().filter(move |t| t.label == label)
    }

    pub fn count(&self, label: ActionCommand) -> usize {
        self.by_label(label).count()
    }

    pub fn contains(&self, label: ActionCommand) -> bool {
        self.labels.contains(&label)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_reader::parse_templates;

    fn flat(value: f32, len: usize) -> Series {
        vec![vec![value; len]; 3]
    }

    #[test]
    fn test_empty_library_is_an_error() {
        assert!(matches!(
            TemplateLibrary::new(Vec::new()),
            Err(LibraryError::Empty)
        ));
    }

    #[test]
    fn test_label_order_is_first_seen() {
        let library = TemplateLibrary::new(vec![
            GestureTemplate::new(ActionCommand::Land, flat(0.0, 5)),
            GestureTemplate::new(ActionCommand::GoForward, flat(1.0, 5)),
            GestureTemplate::new(ActionCommand::Land, flat(2.0, 7)),
        ])
        .unwrap();

        assert_eq!(
            library.labels(),
            &[ActionCommand::Land, ActionCommand::GoForward]
        );
        assert_eq!(library.count(ActionCommand::Land), 2);
        assert_eq!(library.count(ActionCommand::GoForward), 1);
        assert!(!library.contains(ActionCommand::Hover));
    }

    #[test]
    fn test_rejects_ragged_template() {
        let ragged = vec![vec![0.0; 5], vec![0.0; 5], vec![0.0; 4]];
        assert!(matches!(
            TemplateLibrary::new(vec![GestureTemplate::new(ActionCommand::Land, ragged)]),
            Err(LibraryError::BadShape { index: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_command_fails_at_load() {
        let raw = parse_templates(
            "COMMAND 9 SAMPLE 1\n\
             Accel X : 1;2\n\
             Accel Y : 1;2\n\
             Accel Z : 1;2\n\
             Gyro X : 1;2\n\
             Gyro Y : 1;2\n\
             Gyro Z : 1;2\n",
        )
        .unwrap();
        let map = LabelMap::parse("1:GOFORWARD").unwrap();

        assert!(matches!(
            TemplateLibrary::from_raw(raw.clone(), &map),
            Err(LibraryError::Label(LabelMapError::UnknownCommand(9)))
        ));

        let map = LabelMap::parse("9:TAKEOFF").unwrap();
        let library = TemplateLibrary::from_raw(raw, &map).unwrap();
        assert_eq!(library.templates()[0].label, ActionCommand::Takeoff);
        assert_eq!(library.templates()[0].command, 9);
        assert_eq!(library.templates()[0].len(), 2);
    }
}
