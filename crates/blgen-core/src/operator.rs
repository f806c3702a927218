//! Operator interaction
//!
//! The external sample clock is switched by hand. The generator tells the
//! operator when to enable it (after the start command) and when to disable
//! it (after playback has finished).

use std::fmt;
use std::io::{self, BufRead, Write};

/// Instructions shown to the operator during a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorPrompt {
    /// Generation has started; the clock may now be applied
    EnableClock,
    /// Playback is complete; the clock may be removed
    DisableClock,
}

impl OperatorPrompt {
    pub fn message(&self) -> &'static str {
        match self {
            OperatorPrompt::EnableClock => "Enable External Clock now.",
            OperatorPrompt::DisableClock => "Disable External Clock now.",
        }
    }
}

impl fmt::Display for OperatorPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Something that can deliver prompts to the person at the bench
pub trait Operator {
    fn prompt(&mut self, prompt: OperatorPrompt) -> io::Result<()>;
}

/// Write a prompt line and optionally wait for the operator to press Enter
pub fn prompt_on<W: Write, R: BufRead>(
    out: &mut W,
    input: &mut R,
    prompt: OperatorPrompt,
    confirm: bool,
) -> io::Result<()> {
    writeln!(out, "{}", prompt)?;
    if confirm {
        write!(out, "Press Enter to continue...")?;
        out.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
    } else {
        out.flush()?;
    }
    Ok(())
}

/// Operator on the controlling terminal: prompts on stdout
#[derive(Debug, Clone, Default)]
pub struct ConsoleOperator {
    confirm: bool,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for Enter after each prompt
    pub fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }
}

impl Operator for ConsoleOperator {
    fn prompt(&mut self, prompt: OperatorPrompt) -> io::Result<()> {
        let stdout = io::stdout();
        let stdin = io::stdin();
        prompt_on(&mut stdout.lock(), &mut stdin.lock(), prompt, self.confirm)
    }
}

/// Records prompts instead of showing them; used for unattended runs and tests
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    prompts: Vec<OperatorPrompt>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> &[OperatorPrompt] {
        &self.prompts
    }
}

impl Operator for ScriptedOperator {
    fn prompt(&mut self, prompt: OperatorPrompt) -> io::Result<()> {
        tracing::debug!(prompt = prompt.message(), "Operator prompt recorded");
        self.prompts.push(prompt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_messages() {
        assert_eq!(OperatorPrompt::EnableClock.to_string(), "Enable External Clock now.");
        assert_eq!(OperatorPrompt::DisableClock.to_string(), "Disable External Clock now.");
    }

    #[test]
    fn test_prompt_without_confirmation() {
        let mut out = Vec::new();
        let mut input = Cursor::new(Vec::new());
        prompt_on(&mut out, &mut input, OperatorPrompt::EnableClock, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Enable External Clock now.\n");
    }

    #[test]
    fn test_prompt_waits_for_enter() {
        let mut out = Vec::new();
        let mut input = Cursor::new(b"\nleftover\n".to_vec());
        prompt_on(&mut out, &mut input, OperatorPrompt::DisableClock, true).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Disable External Clock now.\n"));
        assert!(text.ends_with("Press Enter to continue..."));
        // Only one line consumed
        assert_eq!(input.position(), 1);
    }

    #[test]
    fn test_scripted_operator_records() {
        let mut operator = ScriptedOperator::new();
        operator.prompt(OperatorPrompt::EnableClock).unwrap();
        operator.prompt(OperatorPrompt::DisableClock).unwrap();
        assert_eq!(
            operator.prompts(),
            &[OperatorPrompt::EnableClock, OperatorPrompt::DisableClock]
        );
    }
}
