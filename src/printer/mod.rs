//! User-facing console output: plain lines, coloured headings, markdown answers (termimad).

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::config::Config;

pub struct Console<W: Write> {
    out: W,
    color: bool,
    markdown: Option<MadSkin>,
}

impl Console<io::Stdout> {
    pub fn stdout(cfg: &Config) -> Self {
        let color = io::stdout().is_terminal();
        let markdown = (color && cfg.get_bool("PRETTIFY_MARKDOWN")).then(MadSkin::default);
        Self { out: io::stdout(), color, markdown }
    }
}

impl<W: Write> Console<W> {
    /// No colour, no markdown: exactly the text written.
    pub fn plain(out: W) -> Self {
        Self { out, color: false, markdown: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn heading(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", text.cyan().bold())
        } else {
            writeln!(self.out, "{}", text)
        }
    }

    pub fn error(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", text.red())
        } else {
            writeln!(self.out, "{}", text)
        }
    }

    /// Write `text` without a newline and flush, for input prompts.
    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            write!(self.out, "{}", text.magenta())?;
        } else {
            write!(self.out, "{}", text)?;
        }
        self.out.flush()
    }

    pub fn answer(&mut self, text: &str) -> io::Result<()> {
        match &self.markdown {
            Some(skin) => writeln!(self.out, "{}", skin.term_text(text)),
            None => writeln!(self.out, "{}", text),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_console_writes_text_verbatim() {
        let mut c = Console::plain(Vec::new());
        c.heading("Output:").unwrap();
        c.answer("**42**").unwrap();
        c.prompt("Your question: ").unwrap();
        c.error("boom").unwrap();
        let s = String::from_utf8(c.into_inner()).unwrap();
        assert_eq!(s, "Output:\n**42**\nYour question: boom\n");
    }
}
