use crate::types::ActionEvent;
use crossbeam_channel::Sender;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("El receptor de acciones se ha desconectado")]
    Disconnected,
}

/// Frontera con el actuador: recibe cada acción decidida (nunca NOTHING).
///
/// El actuador es quien mantiene la acción activa durante `hold`.
pub trait ActionSink: Send {
    fn emit(&mut self, event: &ActionEvent) -> Result<(), SinkError>;
}

impl ActionSink for Sender<ActionEvent> {
    fn emit(&mut self, event: &ActionEvent) -> Result<(), SinkError> {
        self.send(*event).map_err(|_| SinkError::Disconnected)
    }
}

/// Sólo registra las acciones
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ActionSink for LogSink {
    fn emit(&mut self, event: &ActionEvent) -> Result<(), SinkError> {
        match event.hold {
            Some(hold) => info!(
                "🎮 {} @ {} ms (mantener {} ms)",
                event.label,
                event.timestamp_ms,
                hold.as_millis()
            ),
            None => info!("🎮 {} @ {} ms", event.label, event.timestamp_ms),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionCommand;
    use crossbeam_channel::bounded;

    #[test]
    fn test_channel_sink_forwards_and_detects_disconnect() {
        let (mut tx, rx) = bounded::<ActionEvent>(4);
        let event = ActionEvent {
            label: ActionCommand::Land,
            timestamp_ms: 42,
            hold: None,
        };

        tx.emit(&event).unwrap();
        assert_eq!(rx.try_recv(), Ok(event));

        drop(rx);
        assert_eq!(tx.emit(&event), Err(SinkError::Disconnected));
    }

    #[test]
    fn test_log_sink_never_fails() {
        let mut sink = LogSink;
        let held = ActionEvent {
            label: ActionCommand::Takeoff,
            timestamp_ms: 7,
            hold: Some(std::time::Duration::from_millis(800)),
        };
        assert_eq!(sink.emit(&held), Ok(()));
        assert_eq!(sink.emit(&ActionEvent::nothing(8)), Ok(()));
    }
}
