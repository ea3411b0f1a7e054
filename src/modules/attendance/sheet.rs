//! Working copy of one attendance sheet.
//!
//! A sheet is keyed by (date, session, class). Opening a key marks every
//! roster student present, then overlays whatever was already saved for that
//! exact key. Both the open and the submit paths start from that same sheet, so
//! the counts a desk sees are the counts it submits. A student only becomes
//! unmarked when the desk clears the default explicitly.
//!
//! A client that keeps a sheet open across refreshes holds one of these and
//! calls [`AttendanceSheet::sync`] with every reload.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use schooldesk_models::StudentId;
use schooldesk_models::attendance::{
    AttendanceCounts, AttendanceError, AttendanceRecord, AttendanceStatus, ClassSelection, MarkDto,
    Session, SheetEntry,
};
use schooldesk_models::roster::RosterStudent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetKey {
    pub date: NaiveDate,
    pub session: Session,
    pub class: ClassSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl Mark {
    pub fn present() -> Self {
        Self {
            status: AttendanceStatus::Present,
            reason: None,
            notes: None,
        }
    }
}

impl From<&MarkDto> for Mark {
    fn from(dto: &MarkDto) -> Self {
        Self {
            status: dto.status,
            reason: non_blank(dto.reason.as_deref()),
            notes: non_blank(dto.notes.as_deref()),
        }
    }
}

impl From<&AttendanceRecord> for Mark {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            status: record.status,
            reason: record.reason.clone(),
            notes: record.notes.clone(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct AttendanceSheet {
    key: SheetKey,
    roster: Vec<RosterStudent>,
    marks: HashMap<StudentId, Mark>,
}

impl AttendanceSheet {
    /// Everyone present, then saved records for `key` on top.
    pub fn initialize(key: SheetKey, roster: Vec<RosterStudent>, saved: &[AttendanceRecord]) -> Self {
        let marks = roster.iter().map(|s| (s.id, Mark::present())).collect();
        let mut sheet = Self { key, roster, marks };
        sheet.overlay(saved);
        sheet
    }

    /// Re-initializes only when `key` differs from the current one.
    ///
    /// A reload that brings a new saved-record set for the same key leaves the
    /// desk's unsaved edits alone. Returns whether the sheet was rebuilt.
    pub fn sync(
        &mut self,
        key: SheetKey,
        roster: Vec<RosterStudent>,
        saved: &[AttendanceRecord],
    ) -> bool {
        if key == self.key {
            return false;
        }
        *self = Self::initialize(key, roster, saved);
        true
    }

    fn overlay(&mut self, saved: &[AttendanceRecord]) {
        let on_roster: HashSet<StudentId> = self.roster.iter().map(|s| s.id).collect();
        for record in saved {
            if record.date == self.key.date
                && record.session == self.key.session
                && on_roster.contains(&record.student_id)
            {
                self.marks.insert(record.student_id, Mark::from(record));
            }
        }
    }

    pub fn key(&self) -> SheetKey {
        self.key
    }

    pub fn roster(&self) -> &[RosterStudent] {
        &self.roster
    }

    pub fn student(&self, id: StudentId) -> Option<&RosterStudent> {
        self.roster.iter().find(|s| s.id == id)
    }

    pub fn mark_of(&self, id: StudentId) -> Option<&Mark> {
        self.marks.get(&id)
    }

    /// Removes the marks of `ids`, leaving them unmarked; all or nothing.
    pub fn clear(&mut self, ids: &[StudentId]) -> Result<(), AttendanceError> {
        if let Some(&student_id) = ids.iter().find(|id| self.student(**id).is_none()) {
            return Err(AttendanceError::StudentNotInRoster { student_id });
        }
        for id in ids {
            self.marks.remove(id);
        }
        Ok(())
    }

    /// Applies a batch of marks; all or nothing.
    pub fn apply(&mut self, marks: &[MarkDto]) -> Result<(), AttendanceError> {
        let mut seen = HashSet::with_capacity(marks.len());
        for dto in marks {
            if self.student(dto.student_id).is_none() {
                return Err(AttendanceError::StudentNotInRoster {
                    student_id: dto.student_id,
                });
            }
            if !seen.insert(dto.student_id) {
                return Err(AttendanceError::DuplicateMark {
                    student_id: dto.student_id,
                });
            }
        }
        for dto in marks {
            self.marks.insert(dto.student_id, Mark::from(dto));
        }
        Ok(())
    }

    pub fn counts(&self) -> AttendanceCounts {
        AttendanceCounts::tally(
            self.roster.len(),
            self.roster
                .iter()
                .map(|s| self.marks.get(&s.id).map(|m| m.status)),
        )
    }

    pub fn entries(&self) -> Vec<SheetEntry> {
        self.roster
            .iter()
            .map(|student| {
                let mark = self.marks.get(&student.id);
                SheetEntry {
                    student_id: student.id,
                    class_id: student.class_id,
                    full_name: student.full_name(),
                    roll_number: student.roll_number,
                    status: mark.map(|m| m.status),
                    reason: mark.and_then(|m| m.reason.clone()),
                    notes: mark.and_then(|m| m.notes.clone()),
                }
            })
            .collect()
    }
}
