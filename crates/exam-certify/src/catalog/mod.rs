//! Question catalog: published, versioned exam content.
//!
//! The engine only ever reads the catalog. Reference answers stay on the
//! examiner side: candidates receive [`CandidateQuestion`] views.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};
use crate::model::{ExamKey, ModuleId, QuestionId, TrackId};

/// A catalog question belonging to one (track, module).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub exam: ExamKey,
    pub version: u32,
    pub prompt: String,
    /// Point value; the cap applied to examiner scores.
    pub points: u32,
    /// Examiner-only reference answer.
    pub reference_answer: String,
    pub is_published: bool,
}

/// What a candidate is allowed to see of a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateQuestion {
    pub id: QuestionId,
    pub prompt: String,
    pub points: u32,
}

impl From<&Question> for CandidateQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            prompt: q.prompt.clone(),
            points: q.points,
        }
    }
}

/// Read-only access to tracks and their published questions.
pub trait QuestionCatalog: Send + Sync {
    /// Modules of a track in declared (unlock) order.
    fn track_modules(&self, track: &TrackId) -> Result<Vec<ModuleId>>;

    /// Published questions for an exam. Unpublished questions are never returned.
    fn published_questions(&self, exam: &ExamKey) -> Result<Vec<Question>>;
}

/// Sum of points of the published questions of an exam.
///
/// An exam with no published questions scores out of 0 rather than failing.
pub fn max_score(catalog: &dyn QuestionCatalog, exam: &ExamKey) -> Result<f64> {
    let questions = catalog.published_questions(exam)?;
    if questions.is_empty() {
        log::warn!("no published questions for exam {exam}; max score is 0");
    }
    Ok(questions.iter().map(|q| f64::from(q.points)).sum())
}

/// Declared modules of a track that have at least one published question.
pub fn expected_modules(catalog: &dyn QuestionCatalog, track: &TrackId) -> Result<Vec<ModuleId>> {
    let mut expected = Vec::new();
    for module in catalog.track_modules(track)? {
        let exam = ExamKey::new(track.clone(), module.clone());
        if !catalog.published_questions(&exam)?.is_empty() {
            expected.push(module);
        }
    }
    Ok(expected)
}

// ── InMemoryCatalog ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackEntry {
    id: TrackId,
    modules: Vec<ModuleId>,
}

/// On-disk shape of a catalog file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    tracks: Vec<TrackEntry>,
    questions: Vec<Question>,
}

/// Catalog held in memory, optionally loaded from a JSON file.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    tracks: BTreeMap<TrackId, Vec<ModuleId>>,
    questions: BTreeMap<ExamKey, Vec<Question>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a track and the order of its modules.
    pub fn add_track(&mut self, track: TrackId, modules: Vec<ModuleId>) {
        self.tracks.insert(track, modules);
    }

    /// Add or replace a question. A newer version replaces an older one.
    pub fn add_question(&mut self, question: Question) {
        let slot = self.questions.entry(question.exam.clone()).or_default();
        match slot.iter_mut().find(|q| q.id == question.id) {
            Some(existing) if existing.version <= question.version => *existing = question,
            Some(_) => {}
            None => slot.push(question),
        }
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Configuration` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExamError::Configuration(format!("cannot read catalog {}: {e}", path.display()))
        })?;
        let file: CatalogFile = serde_json::from_slice(&bytes).map_err(|e| {
            ExamError::Configuration(format!("invalid catalog {}: {e}", path.display()))
        })?;

        let mut catalog = Self::new();
        for track in file.tracks {
            catalog.add_track(track.id, track.modules);
        }
        for question in file.questions {
            catalog.add_question(question);
        }
        Ok(catalog)
    }
}

impl QuestionCatalog for InMemoryCatalog {
    fn track_modules(&self, track: &TrackId) -> Result<Vec<ModuleId>> {
        self.tracks
            .get(track)
            .cloned()
            .ok_or_else(|| ExamError::NotFound(format!("track not found: {track}")))
    }

    fn published_questions(&self, exam: &ExamKey) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .get(exam)
            .map(|qs| qs.iter().filter(|q| q.is_published).cloned().collect())
            .unwrap_or_default())
    }
}
