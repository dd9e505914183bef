use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{parse_datetime, parse_outcome, parse_status, to_i64, to_u32, to_u8},
    },
    models::{
        program_progress, program_totals, DrillOutcome, ProgramProgress, ProgramTotals, SessionLog,
        SessionRef,
    },
    session::SessionLogSink,
};

const LOG_COLUMNS: &str = "id, program_id, session_day_order, session_id, squad_id, \
     squad_session_id, status, started_at, completed_at, duration_minutes, rpe, notes";

fn row_to_session_log(row: &Row) -> Result<SessionLog> {
    let status: String = row.get("status")?;
    let started_at: String = row.get("started_at")?;
    let completed_at: String = row.get("completed_at")?;
    let day_order: Option<i64> = row.get("session_day_order")?;
    let duration_minutes: i64 = row.get("duration_minutes")?;
    let rpe: i64 = row.get("rpe")?;

    Ok(SessionLog {
        id: row.get("id")?,
        session_ref: SessionRef {
            program_id: row.get("program_id")?,
            session_day_order: day_order
                .map(|value| to_u32(value, "session_day_order"))
                .transpose()?,
            session_id: row.get("session_id")?,
            squad_id: row.get("squad_id")?,
        },
        squad_session_id: row.get("squad_session_id")?,
        status: parse_status(&status)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        completed_at: parse_datetime(&completed_at, "completed_at")?,
        duration_minutes: to_u32(duration_minutes, "duration_minutes")?,
        rpe: to_u8(rpe, "rpe")?,
        notes: row.get("notes")?,
        drill_performances: Vec::new(),
    })
}

fn load_performances(conn: &Connection, session_log_id: &str) -> Result<Vec<DrillOutcome>> {
    let mut stmt = conn.prepare(
        "SELECT drill_id, outcome, achieved_value
         FROM drill_performances
         WHERE session_log_id = ?1
         ORDER BY position ASC",
    )?;

    let mut rows = stmt.query(params![session_log_id])?;
    let mut performances = Vec::new();
    while let Some(row) = rows.next()? {
        let outcome: String = row.get("outcome")?;
        performances.push(DrillOutcome::new(
            row.get::<_, String>("drill_id")?,
            parse_outcome(&outcome)?,
            row.get("achieved_value")?,
        ));
    }
    Ok(performances)
}

impl Database {
    /// Writes the log and its drill performances in one transaction.
    pub async fn insert_session_log(&self, log: &SessionLog) -> Result<()> {
        let record = log.clone();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open session log transaction")?;

            tx.execute(
                "INSERT INTO session_logs (id, program_id, session_day_order, session_id, squad_id,
                     squad_session_id, status, started_at, completed_at, duration_minutes, rpe, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.session_ref.program_id,
                    record.session_ref.session_day_order,
                    record.session_ref.session_id,
                    record.session_ref.squad_id,
                    record.squad_session_id,
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.completed_at.to_rfc3339(),
                    record.duration_minutes,
                    record.rpe,
                    record.notes,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert session log {}", record.id))?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO drill_performances (session_log_id, position, drill_id, outcome, achieved_value)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (position, performance) in record.drill_performances.iter().enumerate() {
                    stmt.execute(params![
                        record.id,
                        to_i64(position)?,
                        performance.drill_id,
                        performance.result.as_str(),
                        performance.achieved_value,
                    ])
                    .with_context(|| format!("failed to insert drill performance {position}"))?;
                }
            }

            tx.commit().context("failed to commit session log")?;
            Ok(())
        })
        .await
    }

    pub async fn get_session_log(&self, id: &str) -> Result<Option<SessionLog>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let log = conn
                .query_row(
                    &format!("SELECT {LOG_COLUMNS} FROM session_logs WHERE id = ?1"),
                    params![id],
                    |row| Ok(row_to_session_log(row)),
                )
                .optional()?
                .transpose()?;

            match log {
                Some(mut log) => {
                    log.drill_performances = load_performances(conn, &log.id)?;
                    Ok(Some(log))
                }
                None => Ok(None),
            }
        })
        .await
    }

    /// Most recent first.
    pub async fn list_session_logs(&self, limit: usize) -> Result<Vec<SessionLog>> {
        self.execute(move |conn| {
            let mut logs = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {LOG_COLUMNS} FROM session_logs
                     ORDER BY completed_at DESC
                     LIMIT ?1"
                ))?;
                let mut rows = stmt.query(params![to_i64(limit)?])?;
                let mut logs = Vec::new();
                while let Some(row) = rows.next()? {
                    logs.push(row_to_session_log(row)?);
                }
                logs
            };

            for log in &mut logs {
                log.drill_performances = load_performances(conn, &log.id)?;
            }
            Ok(logs)
        })
        .await
    }

    /// Every log of a program, oldest first.
    pub async fn list_program_logs(&self, program_id: &str) -> Result<Vec<SessionLog>> {
        let program_id = program_id.to_string();
        self.execute(move |conn| {
            let mut logs = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {LOG_COLUMNS} FROM session_logs
                     WHERE program_id = ?1
                     ORDER BY completed_at ASC"
                ))?;
                let mut rows = stmt.query(params![program_id])?;
                let mut logs = Vec::new();
                while let Some(row) = rows.next()? {
                    logs.push(row_to_session_log(row)?);
                }
                logs
            };

            for log in &mut logs {
                log.drill_performances = load_performances(conn, &log.id)?;
            }
            Ok(logs)
        })
        .await
    }

    /// Distinct day orders of a program that have at least one saved log.
    pub async fn completed_day_orders(&self, program_id: &str) -> Result<Vec<u32>> {
        let program_id = program_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT session_day_order
                 FROM session_logs
                 WHERE program_id = ?1 AND session_day_order IS NOT NULL
                 ORDER BY session_day_order ASC",
            )?;

            let mut rows = stmt.query(params![program_id])?;
            let mut days = Vec::new();
            while let Some(row) = rows.next()? {
                let day: i64 = row.get(0)?;
                days.push(to_u32(day, "session_day_order")?);
            }
            Ok(days)
        })
        .await
    }

    pub async fn program_progress(
        &self,
        program_id: &str,
        required_days: &[u32],
    ) -> Result<ProgramProgress> {
        let logged = self.completed_day_orders(program_id).await?;
        Ok(program_progress(required_days, &logged))
    }

    pub async fn program_totals(&self, program_id: &str) -> Result<ProgramTotals> {
        let logs = self.list_program_logs(program_id).await?;
        Ok(program_totals(&logs))
    }
}

#[async_trait]
impl SessionLogSink for Database {
    async fn submit(&self, log: &SessionLog) -> Result<()> {
        self.insert_session_log(log).await
    }
}
