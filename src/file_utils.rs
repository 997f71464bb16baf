use anyhow::{Context, Result, anyhow};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::correction::CorrectionReport;
use crate::subtitle_processor::SubtitleTrack;
use crate::transcript::ReferenceTranscript;

// @module: File and directory utilities for the calling layer

// @const: Suffix of corrected subtitle files
pub const CORRECTED_SUFFIX: &str = "corrected";

// @const: Suffix of rendered report files
pub const REPORT_SUFFIX: &str = "report";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Sibling path `<stem>.<suffix>.<extension>`
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P, suffix: &str, extension: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(suffix);
        output_filename.push('.');
        output_filename.push_str(extension);

        input_file.with_file_name(output_filename)
    }

    /// Default path of the corrected subtitle file
    pub fn corrected_subtitle_path<P: AsRef<Path>>(subtitle_file: P) -> PathBuf {
        Self::generate_output_path(subtitle_file, CORRECTED_SUFFIX, "srt")
    }

    /// Default path of the rendered report
    pub fn report_path<P: AsRef<Path>>(subtitle_file: P) -> PathBuf {
        Self::generate_output_path(subtitle_file, REPORT_SUFFIX, "txt")
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Refuse to clobber an existing file unless forced
    pub fn check_writable<P: AsRef<Path>>(path: P, force: bool) -> Result<()> {
        if !force && Self::file_exists(&path) {
            return Err(anyhow!(
                "Output file already exists: {:?} (use --force to overwrite)",
                path.as_ref()
            ));
        }
        Ok(())
    }

    /// Load and normalize a reference transcript
    pub fn load_transcript<P: AsRef<Path>>(path: P) -> Result<ReferenceTranscript> {
        let raw = Self::read_to_string(&path)?;
        let transcript = ReferenceTranscript::new(&raw)
            .with_context(|| format!("Invalid reference transcript: {:?}", path.as_ref()))?;
        debug!(
            "Loaded reference transcript {:?}: {} chars, {} segments",
            path.as_ref(),
            transcript.char_len(),
            transcript.segments().len()
        );
        Ok(transcript)
    }

    /// Load and parse an SRT file
    pub fn load_track<P: AsRef<Path>>(path: P) -> Result<SubtitleTrack> {
        let raw = Self::read_to_string(&path)?;
        let track = SubtitleTrack::parse(&raw)
            .with_context(|| format!("Invalid subtitle file: {:?}", path.as_ref()))?;
        debug!("Loaded {} cues from {:?}", track.len(), path.as_ref());
        Ok(track)
    }

    /// Write a track as SRT
    pub fn save_track<P: AsRef<Path>>(track: &SubtitleTrack, path: P) -> Result<()> {
        Self::write_to_file(path, &track.serialize())
    }

    /// Write the rendered report text
    pub fn save_report<P: AsRef<Path>>(rendered: &str, path: P) -> Result<()> {
        let mut content = rendered.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        Self::write_to_file(path, &content)
    }

    /// Write the report entries as JSON
    pub fn save_json_report<P: AsRef<Path>>(report: &CorrectionReport, path: P) -> Result<()> {
        let json = report.to_json().context("Failed to serialize report")?;
        Self::write_to_file(path, &json)
    }
}
