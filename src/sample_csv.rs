use std::io::Read;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::types::Sample;

/// Columnas: timestamp_ms,ax,ay,az[,gx,gy,gz]
pub const SAMPLE_HEADER: [&str; 7] = ["timestamp_ms", "ax", "ay", "az", "gx", "gy", "gz"];

/// Convierte una fila CSV en muestra. El giroscopio es opcional.
pub fn parse_sample_record(record: &StringRecord) -> Result<Sample> {
    if record.len() != 4 && record.len() != 7 {
        bail!(
            "se esperaban 4 o 7 columnas (timestamp_ms,ax,ay,az[,gx,gy,gz]), hay {}",
            record.len()
        );
    }

    let timestamp_ms: u64 = record[0]
        .parse()
        .with_context(|| format!("timestamp inválido {:?}", &record[0]))?;

    let mut values = [0.0f32; 6];
    for (i, value) in values.iter_mut().enumerate().take(record.len() - 1) {
        let field = &record[i + 1];
        *value = field
            .parse()
            .with_context(|| format!("{} inválido {:?}", SAMPLE_HEADER[i + 1], field))?;
    }

    Ok(Sample::new(
        timestamp_ms,
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
    ))
}

/// Lector en streaming de muestras (stdin, tubería, fichero)
pub fn sample_records<R: Read>(
    reader: R,
    has_headers: bool,
) -> impl Iterator<Item = Result<Sample>> {
    ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader)
        .into_records()
        .enumerate()
        .map(|(row_idx, result)| {
            let record = result.with_context(|| format!("Fila {} ilegible", row_idx + 1))?;
            parse_sample_record(&record).with_context(|| format!("Fila {} inválida", row_idx + 1))
        })
}

/// Carga un flujo grabado con cabecera. Los timestamps no pueden retroceder.
pub fn load_samples_from_csv(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let samples = sample_records(file, true)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("CSV {:?}", path))?;

    ensure!(!samples.is_empty(), "El CSV {:?} no contiene muestras", path);
    if let Some(pair) = samples
        .windows(2)
        .find(|w| w[1].timestamp_ms < w[0].timestamp_ms)
    {
        bail!(
            "Timestamps no monótonos en {:?}: {} después de {}",
            path,
            pair[1].timestamp_ms,
            pair[0].timestamp_ms
        );
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_stream_without_header() {
        let input = "0,1,2,3,4,5,6\n10, 7, 8, 9\n# comentario\n20,1.5,0,-2,0,0,0\n";
        let samples: Vec<Sample> = sample_records(input.as_bytes(), false)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], Sample::new(0, [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]));
        assert_eq!(samples[1], Sample::new(10, [7.0, 8.0, 9.0], [0.0; 3]));
        assert_eq!(samples[2].accel, [1.5, 0.0, -2.0]);
    }

    #[test]
    fn test_bad_rows_report_row_number() {
        let input = "0,1,2,3\n10,1,x,3\n";
        let results: Vec<Result<Sample>> = sample_records(input.as_bytes(), false).collect();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("Fila 2"));

        let short = "0,1,2\n";
        assert!(sample_records(short.as_bytes(), false)
            .next()
            .unwrap()
            .is_err());
    }

    #[test]
    fn test_load_file_checks_monotonic_time() {
        let dir = std::env::temp_dir();
        let ok_path = dir.join(format!("gestodron_samples_ok_{}.csv", std::process::id()));
        let bad_path = dir.join(format!("gestodron_samples_bad_{}.csv", std::process::id()));

        let mut f = std::fs::File::create(&ok_path).unwrap();
        writeln!(f, "timestamp_ms,ax,ay,az,gx,gy,gz").unwrap();
        writeln!(f, "0,1,1,1,0,0,0").unwrap();
        writeln!(f, "5,2,2,2,0,0,0").unwrap();
        drop(f);

        let mut f = std::fs::File::create(&bad_path).unwrap();
        writeln!(f, "timestamp_ms,ax,ay,az").unwrap();
        writeln!(f, "5,1,1,1").unwrap();
        writeln!(f, "4,2,2,2").unwrap();
        drop(f);

        let samples = load_samples_from_csv(&ok_path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].timestamp_ms, 5);
        assert!(load_samples_from_csv(&bad_path).is_err());

        std::fs::remove_file(ok_path).ok();
        std::fs::remove_file(bad_path).ok();
    }
}
