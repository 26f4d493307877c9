//! Lector del fichero de plantillas de gestos.
//!
//! Formato (un bloque por gesto grabado):
//!
//! ```text
//! COMMAND 1 SAMPLE 1
//! Accel X : 2803;2815;2797;...
//! Accel Y : 2311;2316;2291;...
//! Accel Z : 1691;1680;1697;...
//! Gyro X : 1832;1834;1842;...
//! Gyro Y : 1661;1661;1661;...
//! Gyro Z : 1840;1840;1843;...
//! COMMAND 1 SAMPLE 2
//! ...
//! ```

use crate::types::Series;
use std::fs;
use std::path::Path;
use thiserror::Error;

const AXIS_PREFIXES: [&str; 6] = [
    "Accel X :",
    "Accel Y :",
    "Accel Z :",
    "Gyro X :",
    "Gyro Y :",
    "Gyro Z :",
];

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Línea {line}: se esperaba 'COMMAND <n> SAMPLE <m>', encontrado {found:?}")]
    BadHeader { line: usize, found: String },

    #[error("Línea {line}: se esperaba '{expected}', encontrado {found:?}")]
    MissingAxis {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Bloque COMMAND {command} SAMPLE {sample} incompleto: falta '{expected}'")]
    Truncated {
        command: u32,
        sample: u32,
        expected: &'static str,
    },

    #[error("Línea {line}: valor inválido {value:?}")]
    BadValue { line: usize, value: String },

    #[error("Línea {line}: eje vacío")]
    EmptyAxis { line: usize },

    #[error(
        "Bloque COMMAND {command} SAMPLE {sample}: longitudes por eje distintas {lengths:?}"
    )]
    LengthMismatch {
        command: u32,
        sample: u32,
        lengths: [usize; 6],
    },
}

/// Gesto tal como se grabó: número de comando + series de accel y gyro
#[derive(Debug, Clone, PartialEq)]
pub struct RawGesture {
    pub command: u32,
    pub sample: u32,
    pub accel: Series,
    pub gyro: Series,
}

impl RawGesture {
    pub fn len(&self) -> usize {
        self.accel.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn read_templates_file(path: impl AsRef<Path>) -> Result<Vec<RawGesture>, TemplateError> {
    let content = fs::read_to_string(path)?;
    parse_templates(&content)
}

/// Parsea todos los bloques del texto. Las líneas en blanco entre bloques se ignoran.
pub fn parse_templates(content: &str) -> Result<Vec<RawGesture>, TemplateError> {
    let mut gestures = Vec::new();
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line));

    while let Some((line_no, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }

        let (command, sample) = parse_header(line).ok_or_else(|| TemplateError::BadHeader {
            line: line_no,
            found: line.to_string(),
        })?;

        let mut axes: Vec<Vec<f32>> = Vec::with_capacity(AXIS_PREFIXES.len());
        for prefix in AXIS_PREFIXES {
            let (axis_line_no, axis_line) =
                lines.next().ok_or(TemplateError::Truncated {
                    command,
                    sample,
                    expected: prefix,
                })?;
            axes.push(parse_axis(axis_line_no, axis_line, prefix)?);
        }

        let lengths: [usize; 6] = std::array::from_fn(|i| axes[i].len());
        if lengths.iter().any(|&len| len != lengths[0]) {
            return Err(TemplateError::LengthMismatch {
                command,
                sample,
                lengths,
            });
        }

        let gyro = axes.split_off(3);
        gestures.push(RawGesture {
            command,
            sample,
            accel: axes,
            gyro,
        });
    }

    Ok(gestures)
}

/// `COMMAND <n> SAMPLE <m> [resto ignorado]`
fn parse_header(line: &str) -> Option<(u32, u32)> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "COMMAND" {
        return None;
    }
    let command = parse_number(tokens.next()?)?;
    if tokens.next()? != "SAMPLE" {
        return None;
    }
    let sample = parse_number(tokens.next()?)?;
    Some((command, sample))
}

/// Sólo dígitos ASCII: `u32::from_str` aceptaría también un `+` inicial
fn parse_number(token: &str) -> Option<u32> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_axis(
    line_no: usize,
    line: &str,
    prefix: &'static str,
) -> Result<Vec<f32>, TemplateError> {
    let values = line
        .strip_prefix(prefix)
        .ok_or_else(|| TemplateError::MissingAxis {
            line: line_no,
            expected: prefix,
            found: line.to_string(),
        })?
        .trim();

    // Se admite un ';' final, como en los ficheros grabados
    let values = values.strip_suffix(';').unwrap_or(values);
    if values.is_empty() {
        return Err(TemplateError::EmptyAxis { line: line_no });
    }

    values
        .split(';')
        .map(|v| {
            v.trim().parse::<f32>().map_err(|_| TemplateError::BadValue {
                line: line_no,
                value: v.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = "COMMAND 5 SAMPLE 7\n\
        Accel X : 2803;2815;2797;2776;\n\
        Accel Y : 2311;2316;2291;2294;\n\
        Accel Z : 1691;1680;1697;1722;\n\
        Gyro X : 1832;1834;1842;1844;\n\
        Gyro Y : 1661;1661;1661;1664;\n\
        Gyro Z : 1840;1840;1843;1846;\n\
        COMMAND 32 SAMPLE 234 test\n\
        Accel X : 21;22;23;24.25;\n\
        Accel Y : 25;26;27;28;\n\
        Accel Z : 29;30;31;32;\n\
        Gyro X : 1;2;3;4;\n\
        Gyro Y : 5;6;7;8;\n\
        Gyro Z : 9;10;11;12;\n";

    #[test]
    fn test_read_all_blocks() {
        let gestures = parse_templates(TWO_BLOCKS).unwrap();
        assert_eq!(gestures.len(), 2);

        assert_eq!(
            gestures[0],
            RawGesture {
                command: 5,
                sample: 7,
                accel: vec![
                    vec![2803.0, 2815.0, 2797.0, 2776.0],
                    vec![2311.0, 2316.0, 2291.0, 2294.0],
                    vec![1691.0, 1680.0, 1697.0, 1722.0],
                ],
                gyro: vec![
                    vec![1832.0, 1834.0, 1842.0, 1844.0],
                    vec![1661.0, 1661.0, 1661.0, 1664.0],
                    vec![1840.0, 1840.0, 1843.0, 1846.0],
                ],
            }
        );
        assert_eq!(gestures[1].command, 32);
        assert_eq!(gestures[1].sample, 234);
        assert_eq!(gestures[1].accel[0], vec![21.0, 22.0, 23.0, 24.25]);
        assert_eq!(gestures[1].gyro[2], vec![9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_missing_gyro_z_is_rejected() {
        let truncated: String = TWO_BLOCKS
            .lines()
            .take(6)
            .map(|l| format!("{}\n", l))
            .collect();
        let err = parse_templates(&truncated).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Truncated {
                expected: "Gyro Z :",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_line_inside_file_is_rejected() {
        // Bloque 1 sin "Gyro Z": la cabecera del bloque 2 ocupa su lugar
        let broken: String = TWO_BLOCKS
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 6)
            .map(|(_, l)| format!("{}\n", l))
            .collect();
        let err = parse_templates(&broken).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MissingAxis {
                line: 7,
                expected: "Gyro Z :",
                ..
            }
        ));
    }

    #[test]
    fn test_axis_length_mismatch_is_rejected() {
        let broken = TWO_BLOCKS.replace("Gyro Y : 5;6;7;8;", "Gyro Y : 5;6;7;");
        let err = parse_templates(&broken).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::LengthMismatch {
                command: 32,
                sample: 234,
                lengths: [4, 4, 4, 4, 3, 4],
            }
        ));
    }

    #[test]
    fn test_bad_value_and_bad_header() {
        let broken = TWO_BLOCKS.replace("2803;", "28a3;");
        assert!(matches!(
            parse_templates(&broken).unwrap_err(),
            TemplateError::BadValue { line: 2, .. }
        ));

        let broken = TWO_BLOCKS.replace("COMMAND 5 SAMPLE 7", "COMMAND five SAMPLE 7");
        assert!(matches!(
            parse_templates(&broken).unwrap_err(),
            TemplateError::BadHeader { line: 1, .. }
        ));

        for header in ["COMMAND +5 SAMPLE 7", "COMMAND 5 SAMPLE +7"] {
            let broken = TWO_BLOCKS.replace("COMMAND 5 SAMPLE 7", header);
            assert!(matches!(
                parse_templates(&broken).unwrap_err(),
                TemplateError::BadHeader { line: 1, .. }
            ));
        }
    }

    #[test]
    fn test_empty_input_has_no_gestures() {
        assert!(parse_templates("\n\n").unwrap().is_empty());
    }
}
