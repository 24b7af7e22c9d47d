// Transcript presenter: overwrite interim results in place, commit finals
//
// Before printing anything the current line is erased, so a shorter
// hypothesis never leaves residue from a longer one.

use std::io::{self, Write};

use crate::stt::SpeechResult;

/// Erase the current line: cursor to column 0, clear to end of line
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Renders transcription results to a writer using the overwrite/commit rule
pub struct TranscriptPresenter<W: Write> {
    out: W,
}

impl TranscriptPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TranscriptPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Render one result
    ///
    /// Finals get a line break and scroll away for good; interims stay on
    /// the current line so the next result overwrites them.
    pub fn handle(&mut self, result: &SpeechResult) -> io::Result<()> {
        let text = result.top_text();

        write!(self.out, "{}", CLEAR_LINE)?;

        if result.is_final {
            writeln!(self.out, "{}", text)?;
        } else {
            write!(self.out, "{}", text)?;
        }

        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::Alternative;

    fn interim(text: &str) -> SpeechResult {
        SpeechResult {
            is_final: false,
            alternatives: vec![Alternative {
                text: text.to_string(),
                confidence: Some(0.5),
            }],
        }
    }

    fn final_result(text: &str) -> SpeechResult {
        SpeechResult {
            is_final: true,
            alternatives: vec![Alternative {
                text: text.to_string(),
                confidence: Some(0.9),
            }],
        }
    }

    #[test]
    fn interims_overwrite_and_finals_commit_one_line() {
        let mut presenter = TranscriptPresenter::new(Vec::new());

        presenter.handle(&interim("he")).unwrap();
        presenter.handle(&interim("hello")).unwrap();
        presenter.handle(&final_result("hello world")).unwrap();

        let output = String::from_utf8(presenter.into_inner()).unwrap();

        assert_eq!(
            output,
            format!("{c}he{c}hello{c}hello world\n", c = CLEAR_LINE)
        );
        // Exactly one committed line
        assert_eq!(output.matches('\n').count(), 1);
        assert!(output.ends_with("hello world\n"));
    }

    #[test]
    fn every_print_erases_the_line_first() {
        let mut presenter = TranscriptPresenter::new(Vec::new());
        presenter.handle(&interim("a much longer hypothesis")).unwrap();
        presenter.handle(&interim("short")).unwrap();

        let output = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(output.ends_with(&format!("{}short", CLEAR_LINE)));
    }

    #[test]
    fn result_without_alternatives_prints_empty() {
        let mut presenter = TranscriptPresenter::new(Vec::new());
        presenter
            .handle(&SpeechResult {
                is_final: true,
                alternatives: vec![],
            })
            .unwrap();

        let output = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(output, format!("{}\n", CLEAR_LINE));
    }
}
