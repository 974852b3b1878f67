//! Terminal frontend for the debugger.
//!
//! Every pause redraws the screen: the source around the current line,
//! breakpoints, the call stack and the tail of the program output, followed
//! by any replies to commands typed since. Lines are shown 1-based.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use termion::{clear, color, cursor, style};

use crate::debugger::{DebugSession, Frontend};
use crate::error::DebugError;

const SOURCE_CONTEXT: u32 = 5;
const OUTPUT_LINES: usize = 6;
const PROMPT: &str = "(jsdb) ";

pub struct TerminalRepl<R, W> {
    input: R,
    output: W,
    /// Clear the screen and use colors.
    fancy: bool,
    messages: Vec<String>,
}

impl TerminalRepl<StdinLock<'static>, Stdout> {
    /// Read from stdin and draw on stdout, with escapes only on a terminal.
    pub fn stdio() -> Self {
        let fancy = termion::is_tty(&io::stdout());
        Self::new(io::stdin().lock(), io::stdout()).fancy(fancy)
    }
}

impl<R: BufRead, W: Write> TerminalRepl<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            fancy: false,
            messages: Vec::new(),
        }
    }

    pub fn fancy(mut self, fancy: bool) -> Self {
        self.fancy = fancy;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn render(&mut self, session: &DebugSession) -> io::Result<()> {
        if self.fancy {
            write!(self.output, "{}{}", clear::All, cursor::Goto(1, 1))?;
        }

        let current = session.current_line();
        match current {
            Some(line) => self.heading(&format!("paused at line {}", line + 1))?,
            None => self.heading("paused")?,
        }

        // Source window
        if let Some(line) = current {
            let context = self.source_context();
            let first = line.saturating_sub(context);
            let last = (line + context).min(session.source_len().saturating_sub(1) as u32);
            for index in first..=last {
                let text = session.source_line(index).unwrap_or_default();
                let marker = if index == line { "=>" } else { "  " };
                let bp = if session.has_breakpoint(index) { "*" } else { " " };
                if self.fancy && index == line {
                    writeln!(
                        self.output,
                        "{}{bp}{marker} {:>4} | {text}{}",
                        color::Fg(color::Yellow),
                        index + 1,
                        color::Fg(color::Reset)
                    )?;
                } else if self.fancy && bp == "*" {
                    writeln!(
                        self.output,
                        "{}{bp}{}{marker} {:>4} | {text}",
                        color::Fg(color::Red),
                        color::Fg(color::Reset),
                        index + 1
                    )?;
                } else {
                    writeln!(self.output, "{bp}{marker} {:>4} | {text}", index + 1)?;
                }
            }
        }

        // Call stack, outermost first, as name#debug_id
        let stack = std::iter::once("<top level>".to_string())
            .chain(session.frames().iter().map(|frame| format!("{}#{}", frame.name, frame.func_id)))
            .collect::<Vec<_>>()
            .join(" > ");
        writeln!(self.output)?;
        writeln!(self.output, "stack: {stack}")?;

        let output = session.output_lines().collect::<Vec<_>>();
        if !output.is_empty() {
            writeln!(self.output, "output:")?;
            for line in &output[output.len().saturating_sub(OUTPUT_LINES)..] {
                writeln!(self.output, "  {line}")?;
            }
        }

        for message in self.messages.drain(..) {
            writeln!(self.output, "{message}")?;
        }
        write!(self.output, "{PROMPT}")?;
        self.output.flush()
    }

    /// Lines shown above and below the current one; fills the terminal
    /// height when drawing on a terminal.
    fn source_context(&self) -> u32 {
        if !self.fancy {
            return SOURCE_CONTEXT;
        }
        match termion::terminal_size() {
            Ok((_, rows)) => (u32::from(rows).saturating_sub(OUTPUT_LINES as u32 + 8) / 2).clamp(2, 12),
            Err(_) => SOURCE_CONTEXT,
        }
    }

    fn heading(&mut self, text: &str) -> io::Result<()> {
        if self.fancy {
            writeln!(self.output, "{}{text}{}", style::Bold, style::Reset)
        } else {
            writeln!(self.output, "{text}")
        }
    }
}

impl<R: BufRead, W: Write> Frontend for TerminalRepl<R, W> {
    fn read_command(&mut self, session: &DebugSession) -> Result<Option<String>, DebugError> {
        self.render(session)?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn show_message(&mut self, message: &str) -> Result<(), DebugError> {
        self.messages.push(message.to_string());
        Ok(())
    }

    fn finished(&mut self, session: &DebugSession) -> Result<(), DebugError> {
        if session.pause_count() > 0 {
            writeln!(self.output, "program finished")?;
            self.output.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsaot_passes::DebugInfo;

    fn paused_session() -> DebugSession {
        let info = DebugInfo {
            functions: vec!["f".to_string()],
            lines: [0, 1, 2].into_iter().collect(),
        };
        let mut session = DebugSession::new("let a = 1;\nf();\nconsole.log(a);\n", info);
        session.set_breakpoint(3).unwrap();
        session.on_line(0);
        session.on_call(0);
        session.on_line(1);
        session.record_output("15\n");
        session
    }

    #[test]
    fn renders_source_stack_and_output() {
        let mut repl = TerminalRepl::new(&b"next\n"[..], Vec::new());
        let command = repl.read_command(&paused_session()).unwrap();
        assert_eq!(command.as_deref(), Some("next\n"));

        let screen = String::from_utf8(repl.into_output()).unwrap();
        assert!(screen.starts_with("paused at line 2\n"));
        assert!(screen.contains("=>    2 | f();"));
        assert!(screen.contains("*      3 | console.log(a);"));
        assert!(screen.contains("stack: <top level> > f#0\n"));
        assert!(screen.contains("  15\n"));
        assert!(screen.ends_with(PROMPT));
    }

    #[test]
    fn messages_show_on_next_prompt() {
        let mut repl = TerminalRepl::new(&b""[..], Vec::new());
        repl.show_message("breakpoint set on line 3").unwrap();
        assert_eq!(repl.read_command(&paused_session()).unwrap(), None);
        let screen = String::from_utf8(repl.into_output()).unwrap();
        assert!(screen.contains("breakpoint set on line 3\n(jsdb) "));
    }

    #[test]
    fn stack_shows_every_frame_with_its_id() {
        let info = DebugInfo {
            functions: vec!["outer".to_string(), "inner".to_string()],
            lines: [0, 1].into_iter().collect(),
        };
        let mut session = DebugSession::new("outer();\ninner();\n", info);
        session.on_line(0);
        session.on_call(0);
        session.on_call(1);
        session.on_line(1);
        let mut repl = TerminalRepl::new(&b""[..], Vec::new());
        repl.read_command(&session).unwrap();
        let screen = String::from_utf8(repl.into_output()).unwrap();
        assert!(screen.contains("stack: <top level> > outer#0 > inner#1\n"));
    }

    #[test]
    fn fancy_mode_clears_the_screen() {
        let mut repl = TerminalRepl::new(&b"c\n"[..], Vec::new()).fancy(true);
        repl.read_command(&paused_session()).unwrap();
        let screen = String::from_utf8(repl.into_output()).unwrap();
        assert!(screen.starts_with(&format!("{}{}", clear::All, cursor::Goto(1, 1))));
    }
}
