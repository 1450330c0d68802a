use crate::session::events::{SessionEvent, SessionEventData};
use std::io::{self, Write};

/// Writes a session's assistant output to a terminal-like sink.
///
/// In streaming mode each delta is written and flushed as it arrives and the idle
/// event closes the block with a newline. Without streaming the complete assistant
/// message is written instead of deltas.
///
/// When a turn produces more than one assistant message (text alongside a tool
/// request, then the answer), the messages are separated by a newline.
pub struct StreamPrinter<W: Write> {
    out: W,
    streaming: bool,
    /// Deltas written since the last message boundary
    line_open: bool,
    /// A newline is owed before the next assistant text
    separator_due: bool,
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W, streaming: bool) -> Self {
        Self {
            out,
            streaming,
            line_open: false,
            separator_due: false,
        }
    }

    pub fn handle(&mut self, event: &SessionEvent) -> io::Result<()> {
        match &event.data {
            SessionEventData::AssistantMessageDelta { delta_content } if self.streaming => {
                self.write_separator()?;
                self.out.write_all(delta_content.as_bytes())?;
                self.line_open = true;
            }
            SessionEventData::AssistantMessage { .. } if self.streaming => {
                if self.line_open {
                    self.line_open = false;
                    self.separator_due = true;
                }
                return Ok(());
            }
            SessionEventData::AssistantMessage { content } => {
                self.write_separator()?;
                self.out.write_all(content.as_bytes())?;
                self.separator_due = true;
            }
            SessionEventData::SessionIdle => {
                writeln!(self.out)?;
                self.line_open = false;
                self.separator_due = false;
            }
            _ => return Ok(()),
        }
        self.out.flush()
    }

    fn write_separator(&mut self) -> io::Result<()> {
        if self.separator_due {
            writeln!(self.out)?;
            self.separator_due = false;
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> SessionEvent {
        SessionEvent::new(SessionEventData::AssistantMessageDelta {
            delta_content: text.to_string(),
        })
    }

    fn idle() -> SessionEvent {
        SessionEvent::new(SessionEventData::SessionIdle)
    }

    #[test]
    fn test_deltas_then_newline_on_idle() {
        let mut printer = StreamPrinter::new(Vec::new(), true);

        printer.handle(&delta("Hel")).unwrap();
        printer.handle(&delta("lo")).unwrap();
        assert_eq!(printer.out, b"Hello");

        printer.handle(&idle()).unwrap();
        assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "Hello\n");
    }

    #[test]
    fn test_streaming_ignores_full_message() {
        let mut printer = StreamPrinter::new(Vec::new(), true);

        printer.handle(&delta("Hi")).unwrap();
        printer
            .handle(&SessionEvent::new(SessionEventData::AssistantMessage {
                content: "Hi".to_string(),
            }))
            .unwrap();
        printer.handle(&idle()).unwrap();

        assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "Hi\n");
    }

    #[test]
    fn test_non_streaming_prints_full_message() {
        let mut printer = StreamPrinter::new(Vec::new(), false);

        printer.handle(&delta("ignored")).unwrap();
        printer
            .handle(&SessionEvent::new(SessionEventData::AssistantMessage {
                content: "It is 41.5°F.".to_string(),
            }))
            .unwrap();
        printer.handle(&idle()).unwrap();

        assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "It is 41.5°F.\n");
    }

    fn message(text: &str) -> SessionEvent {
        SessionEvent::new(SessionEventData::AssistantMessage {
            content: text.to_string(),
        })
    }

    #[test]
    fn test_non_streaming_separates_messages_within_turn() {
        let mut printer = StreamPrinter::new(Vec::new(), false);

        printer.handle(&message("Let me check.")).unwrap();
        printer.handle(&message("It is 41.5°F.")).unwrap();
        printer.handle(&idle()).unwrap();
        printer.handle(&message("Next turn.")).unwrap();
        printer.handle(&idle()).unwrap();

        assert_eq!(
            String::from_utf8(printer.into_inner()).unwrap(),
            "Let me check.\nIt is 41.5°F.\nNext turn.\n"
        );
    }

    #[test]
    fn test_streaming_separates_messages_within_turn() {
        let mut printer = StreamPrinter::new(Vec::new(), true);

        printer.handle(&delta("Let me ")).unwrap();
        printer.handle(&delta("check.")).unwrap();
        printer.handle(&message("Let me check.")).unwrap();
        printer.handle(&delta("Cold.")).unwrap();
        printer.handle(&message("Cold.")).unwrap();
        printer.handle(&idle()).unwrap();

        assert_eq!(
            String::from_utf8(printer.into_inner()).unwrap(),
            "Let me check.\nCold.\n"
        );
    }

    #[test]
    fn test_tool_and_error_events_print_nothing() {
        let mut printer = StreamPrinter::new(Vec::new(), true);

        printer
            .handle(&SessionEvent::new(SessionEventData::SessionError {
                message: "boom".to_string(),
            }))
            .unwrap();

        assert!(printer.into_inner().is_empty());
    }
}
