//! Interactive entry session.
//!
//! Prompts for one member at a time, assigns an identifier and appends the
//! record to its generation's collection. Answers for generation and father
//! uid are memoized in a [`SessionContext`] so consecutive siblings can be
//! entered with a bare Enter.
//!
//! Saves happen under the session's progress lock, so a holder of
//! [`EntrySession::progress`] never observes a half-finished append.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, warn};

use crate::errors::Result;
use crate::record::{non_blank, parse_generation, FieldValue, Gender, MemberDraft, MemberRecord};
use crate::storage::GenerationStore;
use crate::uid;

/// Father uid answer that clears the memoized value.
pub const CLEAR_MARKER: &str = "-";

const RULE: &str = "------------------------------------------";

/// Answers carried from one entry to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub last_generation: Option<String>,
    pub last_father_uid: Option<String>,
}

/// Counts reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub saved: usize,
    pub failed: usize,
}

enum EntryStep {
    Ready(MemberRecord),
    Restart,
    Cancelled,
}

pub struct EntrySession<R, W, S> {
    input: R,
    output: W,
    store: S,
    context: SessionContext,
    progress: Arc<Mutex<SessionSummary>>,
}

impl<R: BufRead, W: Write, S: GenerationStore> EntrySession<R, W, S> {
    pub fn new(input: R, output: W, store: S) -> Self {
        Self {
            input,
            output,
            store,
            context: SessionContext::default(),
            progress: Arc::default(),
        }
    }

    /// Count saves into a shared summary instead of a private one.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<Mutex<SessionSummary>>) -> Self {
        self.progress = progress;
        self
    }

    /// Shared running summary. Locking it waits for an in-flight save.
    pub fn progress(&self) -> Arc<Mutex<SessionSummary>> {
        Arc::clone(&self.progress)
    }

    pub fn summary(&self) -> SessionSummary {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (W, S) {
        (self.output, self.store)
    }

    /// Run until input ends. A failed save is reported and the loop moves on
    /// to the next entry; only terminal I/O errors end the session early.
    pub fn run(&mut self) -> Result<SessionSummary> {
        loop {
            writeln!(self.output, "\n{RULE}")?;
            let record = match self.read_entry()? {
                EntryStep::Ready(record) => record,
                EntryStep::Restart => continue,
                EntryStep::Cancelled => break,
            };
            let saved = {
                let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
                let saved = self.store.append(record.generation, &record);
                match saved {
                    Ok(_) => progress.saved += 1,
                    Err(_) => progress.failed += 1,
                }
                saved
            };
            match saved {
                Ok(location) => {
                    writeln!(self.output, "Saved: {location}")?;
                }
                Err(e) => {
                    error!(uid = %record.uid, error = %e, "save failed");
                    writeln!(self.output, "Error: {e}")?;
                }
            }
        }
        let summary = self.summary();
        writeln!(self.output, "\nBye ({} saved, {} failed)", summary.saved, summary.failed)?;
        Ok(summary)
    }

    fn read_entry(&mut self) -> Result<EntryStep> {
        let prompt = match &self.context.last_generation {
            Some(last) => format!("Generation [Enter reuses '{last}']: "),
            None => "Generation: ".to_string(),
        };
        let Some(answer) = self.ask(&prompt)? else {
            return Ok(EntryStep::Cancelled);
        };
        let label = match (answer.is_empty(), &self.context.last_generation) {
            (false, _) => answer,
            (true, Some(last)) => last.clone(),
            (true, None) => return Ok(EntryStep::Restart),
        };
        let generation = match parse_generation(&label) {
            Ok(generation) => generation,
            Err(e) => {
                writeln!(self.output, "Error: {e}")?;
                return Ok(EntryStep::Restart);
            }
        };
        let canonical = generation.to_string();
        if label != canonical {
            warn!(%label, generation, "generation label normalized");
            writeln!(self.output, "Note: generation '{label}' is recorded as G{generation}")?;
        }
        self.context.last_generation = Some(canonical);

        let prompt = match &self.context.last_father_uid {
            Some(last) => format!("Father UID [Enter reuses '{last}', '{CLEAR_MARKER}' clears]: "),
            None => "Father UID: ".to_string(),
        };
        let Some(answer) = self.ask(&prompt)? else {
            return Ok(EntryStep::Cancelled);
        };
        let father_uid = if answer == CLEAR_MARKER {
            self.context.last_father_uid = None;
            None
        } else if answer.is_empty() {
            self.context.last_father_uid.clone()
        } else {
            self.context.last_father_uid = Some(answer.clone());
            Some(answer)
        };

        let Some(name) = self.ask("Name (required): ")? else {
            return Ok(EntryStep::Cancelled);
        };
        if name.is_empty() {
            return Ok(EntryStep::Restart);
        }
        let uid = uid::generate(generation, &name);
        writeln!(self.output, "UID: {uid}")?;

        let Some(gender) = self.ask("Gender [default 男, f/0 for 女]: ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let Some(sibling_order) = self.ask("Sibling order: ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let Some(birth_date) = self.ask("Birth year (YYYY): ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let Some(alive) = self.ask("Alive? (y/n) [default y]: ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let is_alive = !alive.eq_ignore_ascii_case("n");
        let death_date = if is_alive {
            None
        } else {
            let Some(answer) = self.ask("Death year (YYYY): ")? else {
                return Ok(EntryStep::Cancelled);
            };
            FieldValue::coerce(&answer)
        };
        let Some(spouse) = self.ask("Spouse: ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let Some(official_position) = self.ask("Official position: ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let Some(residence_place) = self.ask("Residence: ")? else {
            return Ok(EntryStep::Cancelled);
        };
        let Some(bio) = self.ask("Note: ")? else {
            return Ok(EntryStep::Cancelled);
        };

        let draft = MemberDraft {
            father_uid,
            generation,
            name,
            gender: Gender::from_input(&gender),
            sibling_order: FieldValue::coerce(&sibling_order),
            is_alive,
            birth_date: FieldValue::coerce(&birth_date),
            death_date,
            spouse: non_blank(Some(spouse)),
            official_position: non_blank(Some(official_position)),
            residence_place: non_blank(Some(residence_place)),
            bio: non_blank(Some(bio)),
        };
        Ok(EntryStep::Ready(draft.into_record_with_uid(uid)?))
    }

    /// Print `prompt` and read one trimmed line. `None` at end of input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            debug!(prompt, "input closed");
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
