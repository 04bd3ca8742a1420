//! Run transcript.
//!
//! A [`Transcript`] is a [`Write`] sink that tees everything the operator
//! sees into `<output_dir>/<script>_<YYYYmmdd-HHMMSS>.txt`. Finishing it
//! renders the captured text, colors included, into an `.html` sibling
//! suitable for mailing.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, warn};

use crate::ansi;
use crate::error::{Result, TranscriptError};

/// Files produced by a finished transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptPaths {
    /// Raw log, escape sequences included.
    pub text: PathBuf,
    /// HTML rendering of the raw log.
    pub html: PathBuf,
}

/// Tee to the console and a timestamped log file.
pub struct Transcript {
    file: File,
    path: PathBuf,
    console: Option<io::Stdout>,
}

impl Transcript {
    /// Create the log file and start teeing to it and to stdout.
    pub fn start(output_dir: &Path, script_name: &str) -> Result<Self> {
        Self::create(output_dir, script_name, Some(io::stdout()))
    }

    /// Like [`Transcript::start`], without the console copy.
    pub fn file_only(output_dir: &Path, script_name: &str) -> Result<Self> {
        Self::create(output_dir, script_name, None)
    }

    fn create(output_dir: &Path, script_name: &str, console: Option<io::Stdout>) -> Result<Self> {
        fs::create_dir_all(output_dir).map_err(|source| TranscriptError::Create {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let path = output_dir.join(format!("{script_name}_{timestamp}.txt"));
        let file = File::create(&path).map_err(|source| TranscriptError::Create {
            path: path.clone(),
            source,
        })?;
        debug!("transcript started at {}", path.display());

        Ok(Self {
            file,
            path,
            console,
        })
    }

    /// Path of the raw log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the log and write its HTML rendering next to it.
    pub fn finish(mut self) -> Result<TranscriptPaths> {
        let write_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| TranscriptError::Write { path, source }
        };

        self.flush().map_err(write_error(&self.path))?;
        let Transcript { file, path, .. } = self;
        drop(file);

        let raw = fs::read(&path).map_err(write_error(&path))?;
        let text = String::from_utf8_lossy(&raw);
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("netops");
        let html_path = path.with_extension("html");
        fs::write(&html_path, ansi::to_html(&text, title)).map_err(write_error(&html_path))?;
        debug!("transcript rendered to {}", html_path.display());

        Ok(TranscriptPaths {
            text: path,
            html: html_path,
        })
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(console) = self.console.as_mut() {
            // The file is the record; a closed terminal must not lose it.
            if let Err(e) = console.write_all(buf).and_then(|_| console.flush()) {
                warn!("console write failed: {}", e);
            }
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(console) = self.console.as_mut() {
            console.flush()?;
        }
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_and_html() {
        let dir = TempDir::new().unwrap();
        let mut transcript = Transcript::file_only(dir.path(), "usercfg").unwrap();

        let name = transcript.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("usercfg_"));
        assert!(name.ends_with(".txt"));
        // usercfg_YYYYmmdd-HHMMSS.txt
        assert_eq!(name.len(), "usercfg_".len() + 15 + ".txt".len());

        writeln!(transcript, "==== Connecting to r1 ====").unwrap();
        writeln!(transcript, "\x1b[33mReview the configuration changes\x1b[0m <diff>").unwrap();
        let paths = transcript.finish().unwrap();

        let raw = fs::read_to_string(&paths.text).unwrap();
        assert!(raw.contains("\x1b[33m"));

        assert_eq!(paths.html, paths.text.with_extension("html"));
        let html = fs::read_to_string(&paths.html).unwrap();
        assert!(!html.contains('\x1b'));
        assert!(html.contains("==== Connecting to r1 ===="));
        assert!(html.contains("&lt;diff&gt;"));
        assert_eq!(html.matches("<span").count(), html.matches("</span>").count());
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("logs").join("netops");
        let transcript = Transcript::file_only(&nested, "test").unwrap();
        assert!(transcript.path().starts_with(&nested));
        transcript.finish().unwrap();
    }

    #[test]
    fn test_report_macro_writes_lines() {
        let dir = TempDir::new().unwrap();
        let mut transcript = Transcript::file_only(dir.path(), "test").unwrap();
        let out = &mut transcript;
        report!(out, "Locking the configuration");
        report!(out, "{} {}", "Unlocking", "the configuration");
        let paths = transcript.finish().unwrap();
        assert_eq!(
            fs::read_to_string(paths.text).unwrap(),
            "Locking the configuration\nUnlocking the configuration\n"
        );
    }
}
