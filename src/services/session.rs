//! Session Service
//!
//! Facade over the session database: create/load/list/update/delete plus
//! the per-session turn guard. No two turns may run concurrently for the
//! same session; callers take a `TurnGuard` before driving a turn and the
//! guard releases the slot on drop.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use overseer_core::{Plan, PlanStepStatus};

use crate::models::session::{Session, SessionSummary, SessionUpdate, VirtualFile};
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

/// Session persistence and turn-serialization service.
pub struct SessionService {
    db: Database,
    active_turns: Arc<Mutex<HashSet<String>>>,
}

impl SessionService {
    /// Create a service over the given database.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            active_turns: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Create an empty session and persist it.
    pub fn create(&self) -> AppResult<Session> {
        let session = Session::new();
        self.db.save_session(&session)?;
        Ok(session)
    }

    /// Load a session, or fail with NotFound.
    pub fn get(&self, id: &str) -> AppResult<Session> {
        self.db
            .get_session(id)?
            .ok_or_else(|| AppError::not_found(format!("session: {}", id)))
    }

    /// List session summaries, most recently updated first.
    pub fn list(&self) -> AppResult<Vec<SessionSummary>> {
        self.db.list_sessions()
    }

    /// Delete a session. Explicit deletion only; sessions are never
    /// removed implicitly.
    pub fn delete(&self, id: &str) -> AppResult<()> {
        if self.db.delete_session(id)? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("session: {}", id)))
        }
    }

    /// Apply a partial update to a stored session (load-merge-save).
    pub fn update(&self, id: &str, update: SessionUpdate) -> AppResult<Session> {
        let mut session = self.get(id)?;
        session.apply(update);
        self.db.save_session(&session)?;
        Ok(session)
    }

    /// Upsert one file in the session's virtual file table.
    ///
    /// The VFS field replaces wholesale per update call, so this reads
    /// the current table, modifies the one entry, and writes it back.
    pub fn write_virtual_file(
        &self,
        id: &str,
        path: &str,
        file: VirtualFile,
    ) -> AppResult<()> {
        let session = self.get(id)?;
        let mut files = session.files.clone();
        files.insert(path.to_string(), file);
        self.update(
            id,
            SessionUpdate {
                files: Some(files),
                ..Default::default()
            },
        )?;
        Ok(())
    }

    /// Replace the session's plan.
    pub fn set_plan(&self, id: &str, plan: Option<Plan>) -> AppResult<()> {
        self.update(
            id,
            SessionUpdate {
                plan: Some(plan),
                ..Default::default()
            },
        )?;
        Ok(())
    }

    /// Apply a monotonic status transition to a plan step. Returns
    /// whether the step actually changed.
    pub fn advance_plan_step(
        &self,
        id: &str,
        step_id: &str,
        status: PlanStepStatus,
    ) -> AppResult<bool> {
        let session = self.get(id)?;
        let mut plan = session
            .plan
            .clone()
            .ok_or_else(|| AppError::not_found(format!("session {} has no plan", id)))?;
        let changed = plan.advance_step(step_id, status)?;
        if changed {
            self.set_plan(id, Some(plan))?;
        }
        Ok(changed)
    }

    /// Begin a turn for the session, rejecting a second concurrent turn.
    pub fn begin_turn(&self, id: &str) -> AppResult<TurnGuard> {
        let mut active = self
            .active_turns
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !active.insert(id.to_string()) {
            return Err(AppError::session_busy(id));
        }
        Ok(TurnGuard {
            session_id: id.to_string(),
            active_turns: Arc::clone(&self.active_turns),
        })
    }
}

/// RAII guard holding a session's turn slot.
pub struct TurnGuard {
    session_id: String,
    active_turns: Arc<Mutex<HashSet<String>>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        let mut active = self
            .active_turns
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        active.remove(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_core::PlanStep;

    fn service() -> SessionService {
        SessionService::new(Database::new_in_memory().unwrap())
    }

    #[test]
    fn test_create_and_get() {
        let svc = service();
        let session = svc.create().unwrap();
        let loaded = svc.get(&session.id).unwrap();
        assert_eq!(loaded.id, session.id);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let svc = service();
        assert!(matches!(svc.get("nope"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let svc = service();
        let session = svc.create().unwrap();
        svc.delete(&session.id).unwrap();
        assert!(svc.get(&session.id).is_err());
        assert!(svc.delete(&session.id).is_err());
    }

    #[test]
    fn test_write_virtual_file_preserves_other_entries() {
        let svc = service();
        let session = svc.create().unwrap();
        svc.write_virtual_file(
            &session.id,
            "a.txt",
            VirtualFile {
                content: "A".to_string(),
                language: None,
                is_writing: false,
            },
        )
        .unwrap();
        svc.write_virtual_file(
            &session.id,
            "b.txt",
            VirtualFile {
                content: "B".to_string(),
                language: None,
                is_writing: false,
            },
        )
        .unwrap();

        let loaded = svc.get(&session.id).unwrap();
        assert_eq!(loaded.files.len(), 2);
        assert_eq!(loaded.files["a.txt"].content, "A");
    }

    #[test]
    fn test_advance_plan_step() {
        let svc = service();
        let session = svc.create().unwrap();
        svc.set_plan(
            &session.id,
            Some(Plan::new("p", vec![PlanStep::new("step-1", "do it")])),
        )
        .unwrap();

        assert!(svc
            .advance_plan_step(&session.id, "step-1", PlanStepStatus::Completed)
            .unwrap());
        // Idempotent: re-applying is a no-op
        assert!(!svc
            .advance_plan_step(&session.id, "step-1", PlanStepStatus::Completed)
            .unwrap());

        let loaded = svc.get(&session.id).unwrap();
        assert_eq!(
            loaded.plan.unwrap().step("step-1").unwrap().status,
            PlanStepStatus::Completed
        );
    }

    #[test]
    fn test_begin_turn_rejects_concurrent_turn() {
        let svc = service();
        let session = svc.create().unwrap();

        let guard = svc.begin_turn(&session.id).unwrap();
        assert!(matches!(
            svc.begin_turn(&session.id),
            Err(AppError::SessionBusy(_))
        ));

        drop(guard);
        // Slot released after drop
        let _guard = svc.begin_turn(&session.id).unwrap();
    }

    #[test]
    fn test_begin_turn_independent_sessions() {
        let svc = service();
        let a = svc.create().unwrap();
        let b = svc.create().unwrap();
        let _ga = svc.begin_turn(&a.id).unwrap();
        let _gb = svc.begin_turn(&b.id).unwrap();
    }
}
