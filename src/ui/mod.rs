// Console interaction module
// Prompts for files and queries and prints results


use console::style;
use std::fs;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::path::{Path, PathBuf};

use crate::database::SearchResult;
use crate::{RagError, Result};

/// Input that ends the current loop
pub const QUIT_COMMAND: &str = "q";

/// Answer to the file prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChoice {
    Quit,
    Selected(PathBuf),
}

/// Answer to the query prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Quit,
    Text(String),
}

/// Regular files directly inside `dir`, sorted by name, as absolute paths
#[inline]
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = std::path::absolute(dir)?;
    let mut files = Vec::new();

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case(QUIT_COMMAND)
}

/// Line-oriented console over any reader and writer
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    /// Console on the process's standard input and output
    #[inline]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    #[inline]
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[inline]
    pub fn into_output(self) -> W {
        self.output
    }

    #[inline]
    pub fn banner(&mut self) -> Result<()> {
        writeln!(
            self.output,
            "\n{}",
            style("🔁 New Session (type 'q' at any prompt to quit)").bold().cyan()
        )?;
        Ok(())
    }

    /// Print the numbered file list and read a selection
    ///
    /// Returns [`FileChoice::Quit`] for `q` or end of input; any answer that is
    /// not a listed number is a [`RagError::FileNotFound`].
    #[inline]
    pub fn choose_file(&mut self, files: &[PathBuf]) -> Result<FileChoice> {
        writeln!(self.output, "\n{}", style("📄 Available Documents:").bold())?;
        if files.is_empty() {
            writeln!(self.output, "  {}", style("(no files found)").dim())?;
        }
        for (i, file) in files.iter().enumerate() {
            let name = file
                .file_name()
                .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
            writeln!(self.output, "{}. {}", i + 1, name)?;
        }

        let Some(answer) = self.prompt("\n📝 Enter the file ID you want to embed: ")? else {
            return Ok(FileChoice::Quit);
        };

        if is_quit(&answer) {
            return Ok(FileChoice::Quit);
        }

        answer
            .parse::<usize>()
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| files.get(index))
            .map(|path| FileChoice::Selected(path.clone()))
            .ok_or_else(|| RagError::FileNotFound(format!("no file with ID {:?}", answer)))
    }

    /// Read the next query. `q` or end of input ends the query loop.
    #[inline]
    pub fn get_query(&mut self) -> Result<Query> {
        match self.prompt("\n❓ Ask something from your docs: ")? {
            None => Ok(Query::Quit),
            Some(answer) if is_quit(&answer) => Ok(Query::Quit),
            Some(answer) => Ok(Query::Text(answer)),
        }
    }

    #[inline]
    pub fn display_results(&mut self, results: &[SearchResult]) -> Result<()> {
        writeln!(self.output, "\n{}", style("🔍 Top Results:").bold())?;
        if results.is_empty() {
            writeln!(self.output, "{}", style("No matching chunks found.").dim())?;
        }
        for (i, result) in results.iter().enumerate() {
            let location = result
                .metadata
                .page
                .map_or_else(|| result.metadata.source.clone(), |page| {
                    format!("{}, page {}", result.metadata.source, page)
                });
            writeln!(
                self.output,
                "\n{} {}\n{}",
                style(format!("Result {}:", i + 1)).bold().yellow(),
                style(format!("({})", location)).dim(),
                result.text
            )?;
        }
        Ok(())
    }

    #[inline]
    pub fn success(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", style(format!("✅ {}", message)).green())?;
        Ok(())
    }

    #[inline]
    pub fn info(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    #[inline]
    pub fn error(&mut self, error: &RagError) -> Result<()> {
        writeln!(self.output, "{}", style(format!("⚠️ Error: {}", error)).red())?;
        Ok(())
    }

    #[inline]
    pub fn goodbye(&mut self) -> Result<()> {
        writeln!(self.output, "👋 Exiting the app. Goodbye!")?;
        Ok(())
    }

    /// Show `message`, then read one trimmed line. `None` at end of input.
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
