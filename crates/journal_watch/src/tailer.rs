use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::events::JournalEvent;
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{forward, parse_line, EventSource};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Follows the newest `Journal*.log` file in a directory.
///
/// Lines already present when the tailer starts are not replayed. When the
/// game opens a newer journal the remainder of the old one is drained first.
pub struct JournalTailer {
    directory: PathBuf,
    poll_interval: Duration,
}

impl JournalTailer {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

struct OpenJournal {
    path: PathBuf,
    offset: u64,
    // Bytes after the last newline; may end inside a multi-byte character.
    partial: Vec<u8>,
}

impl OpenJournal {
    async fn at_end(path: PathBuf) -> Result<Self> {
        let offset = fs::metadata(&path)
            .await
            .with_context(|| format!("failed to stat journal '{}'", path.display()))?
            .len();
        Ok(Self {
            path,
            offset,
            partial: Vec::new(),
        })
    }

    fn at_start(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            partial: Vec::new(),
        }
    }

    /// Reads whatever was appended since the last call and returns the complete lines.
    async fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let mut file = fs::File::open(&self.path)
            .await
            .with_context(|| format!("failed to open journal '{}'", self.path.display()))?;
        let len = file.metadata().await?.len();
        if len < self.offset {
            warn!(path = %self.path.display(), "journal: file shrank, rereading from start");
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buf).await?;
        self.offset += buf.len() as u64;
        self.partial.extend_from_slice(&buf);

        let mut lines = Vec::new();
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok(lines)
    }

    /// Hands back an unterminated final line, if any.
    fn take_partial(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.partial);
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        (!line.is_empty()).then(|| line.to_string())
    }
}

/// Returns the newest journal file in `directory`, by file name.
pub async fn newest_journal(directory: &Path) -> Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(directory)
        .await
        .with_context(|| format!("failed to read journal directory '{}'", directory.display()))?;

    let mut newest: Option<(String, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("Journal") || !name.ends_with(".log") {
            continue;
        }
        if newest.as_ref().map_or(true, |(best, _)| name > *best) {
            newest = Some((name, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Forwards parsed lines to the sink. Returns false when the run should end.
async fn forward_lines(
    lines: Vec<String>,
    source: &Path,
    sink: &mpsc::Sender<JournalEvent>,
    cancel: &CancellationToken,
) -> bool {
    for line in lines {
        match parse_line(&line) {
            Ok(Some(event)) => {
                if !forward(sink, cancel, event).await {
                    return false;
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(path = %source.display(), %error, "journal: skipping malformed line");
            }
        }
    }
    true
}

#[async_trait]
impl EventSource for JournalTailer {
    async fn run(&self, sink: mpsc::Sender<JournalEvent>, cancel: CancellationToken) -> Result<()> {
        let mut current = match newest_journal(&self.directory).await? {
            Some(path) => Some(OpenJournal::at_end(path).await?),
            None => None,
        };
        info!(
            directory = %self.directory.display(),
            journal = ?current.as_ref().map(|j| j.path.display().to_string()),
            "journal: watching"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let newest = match newest_journal(&self.directory).await {
                Ok(newest) => newest,
                Err(error) => {
                    warn!(%error, "journal: directory scan failed");
                    continue;
                }
            };

            if let Some(newest) = newest {
                if current.as_ref().map(|j| &j.path) != Some(&newest) {
                    if let Some(mut previous) = current.take() {
                        if let Ok(lines) = previous.read_new_lines().await {
                            if !forward_lines(lines, &previous.path, &sink, &cancel).await {
                                return Ok(());
                            }
                        }
                    }
                    info!(journal = %newest.display(), "journal: switched to newer file");
                    current = Some(OpenJournal::at_start(newest));
                }
            }

            let Some(journal) = current.as_mut() else {
                continue;
            };
            match journal.read_new_lines().await {
                Ok(lines) => {
                    if !lines.is_empty() {
                        debug!(count = lines.len(), "journal: read new lines");
                    }
                    if !forward_lines(lines, &journal.path, &sink, &cancel).await {
                        return Ok(());
                    }
                }
                Err(error) => warn!(%error, "journal: read failed"),
            }
        }
    }

    fn describe(&self) -> String {
        format!("journal directory {}", self.directory.display())
    }
}

/// Feeds one recorded journal file through once, then idles until cancelled.
pub struct JournalFileReplay {
    path: PathBuf,
}

impl JournalFileReplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSource for JournalFileReplay {
    async fn run(&self, sink: mpsc::Sender<JournalEvent>, cancel: CancellationToken) -> Result<()> {
        let mut journal = OpenJournal::at_start(self.path.clone());
        let mut lines = journal.read_new_lines().await?;
        if let Some(last) = journal.take_partial() {
            lines.push(last);
        }
        info!(path = %self.path.display(), lines = lines.len(), "journal: replaying recorded file");

        if forward_lines(lines, &self.path, &sink, &cancel).await {
            cancel.cancelled().await;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("journal replay {}", self.path.display())
    }
}
