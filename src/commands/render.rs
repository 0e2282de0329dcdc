//! Snapshot Rendering
//!
//! Prints what changed between successive session snapshots: status and
//! loading messages, per-artifact progress in 25% steps, and the assistant's
//! reply as it streams in.

use std::io::{self, Write};

use crate::models::session::{SessionSnapshot, SessionStatus};

const PROGRESS_STEP: f64 = 25.0;

/// Remembers what was already printed.
#[derive(Debug, Default)]
pub struct Renderer {
    status: SessionStatus,
    loading_message: Option<String>,
    error: Option<String>,
    /// (file, last printed progress step)
    progress: Vec<(String, u32)>,
    /// Transcript index of the assistant turn being streamed
    active: Option<usize>,
    printed_len: usize,
    answer_marked: bool,
    was_running: bool,
    degraded: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write everything new in `snap` to `out`.
    pub fn render(&mut self, snap: &SessionSnapshot, out: &mut impl Write) -> io::Result<()> {
        if snap.loading_message.is_some() && snap.loading_message != self.loading_message {
            if let Some(message) = &snap.loading_message {
                writeln!(out, "… {}", message)?;
            }
        }
        self.loading_message = snap.loading_message.clone();

        self.render_progress(snap, out)?;

        if snap.status != self.status {
            writeln!(out, "[{}]", snap.status)?;
            if snap.status == SessionStatus::Ready {
                writeln!(out, "Model ready. Type a message, or /help.")?;
            }
            self.status = snap.status;
        }

        if snap.error.is_some() && snap.error != self.error {
            if let Some(error) = &snap.error {
                writeln!(out, "\nerror: {}", error)?;
            }
        }
        self.error = snap.error.clone();

        if snap.degraded && !self.degraded {
            writeln!(out, "\nwarning: worker sent unexpected events; output may be incomplete")?;
        }
        self.degraded = snap.degraded;

        self.render_stream(snap, out)?;
        out.flush()
    }

    fn render_progress(&mut self, snap: &SessionSnapshot, out: &mut impl Write) -> io::Result<()> {
        let mut seen = Vec::with_capacity(snap.progress.len());
        for artifact in &snap.progress {
            let step = (artifact.percent() / PROGRESS_STEP).floor().max(0.0) as u32;
            let previous = self
                .progress
                .iter()
                .find(|(file, _)| file == &artifact.file)
                .map(|(_, step)| *step);
            if previous != Some(step) {
                writeln!(
                    out,
                    "  {:<32} {:>5.1}%",
                    artifact.file,
                    artifact.percent()
                )?;
            }
            seen.push((artifact.file.clone(), step));
        }
        self.progress = seen;
        Ok(())
    }

    fn render_stream(&mut self, snap: &SessionSnapshot, out: &mut impl Write) -> io::Result<()> {
        if snap.transcript.is_empty() {
            self.active = None;
        }

        if snap.is_running {
            if let Some(idx) = snap.transcript.len().checked_sub(1) {
                let last = &snap.transcript[idx];
                if last.role == lumen_core::Role::Assistant && self.active != Some(idx) {
                    self.active = Some(idx);
                    self.printed_len = 0;
                    self.answer_marked = false;
                    write!(out, "assistant> ")?;
                }
            }
        }

        if let Some(msg) = self.active.and_then(|idx| snap.transcript.get(idx)) {
            let content = &msg.content;
            if content.len() > self.printed_len {
                let mut from = self.printed_len;
                if let Some(offset) = msg.answer_offset {
                    if !self.answer_marked && offset >= from {
                        write!(out, "{}", &content[from..offset])?;
                        if offset > 0 {
                            write!(out, "\n---\n")?;
                        }
                        self.answer_marked = true;
                        from = offset;
                    }
                }
                write!(out, "{}", &content[from..])?;
                self.printed_len = content.len();
            }
        }

        if self.was_running && !snap.is_running {
            match snap.last_metrics {
                Some(metrics) => match metrics.elapsed_secs() {
                    Some(secs) => writeln!(
                        out,
                        "\n(Generated {} tokens in {:.2} seconds, {:.1} tokens/second)",
                        metrics.token_count, secs, metrics.tokens_per_second
                    )?,
                    None => writeln!(out, "\n(Generated {} tokens)", metrics.token_count)?,
                },
                None => writeln!(out)?,
            }
            self.active = None;
        }
        self.was_running = snap.is_running;
        Ok(())
    }
}
