//! Session management CLI commands: list, show, delete, clear.
//!
//! These work on the stored registry directly and never contact the LLM
//! provider, so no API key is needed.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use chatshelf_core::chat::registry::SessionRegistry;
use chatshelf_core::storage::history_store::HistoryStore;
use chatshelf_types::chat::Session;

use crate::state::{AppState, ShelfStore};

use super::chat::commands::resolve_session_ref;
use super::chat::renderer::ChatRenderer;

async fn load_registry(state: &AppState) -> Result<(ShelfStore, SessionRegistry)> {
    let store = state.open_store().await?;
    let histories = store.load().await.context("Failed to read chat history")?;
    let loaded = SessionRegistry::from_stored(histories);
    for err in &loaded.malformed {
        eprintln!("  {} Skipped stored session: {err}", style("!").yellow().bold());
    }
    Ok((store, loaded.registry))
}

fn find_session<'a>(registry: &'a SessionRegistry, reference: &str) -> Result<&'a Session> {
    let sessions = registry.list_ordered_by_recency();
    let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    let id = resolve_session_ref(reference, &ids)
        .with_context(|| format!("Session '{reference}' not found"))?;
    registry
        .get(id)
        .with_context(|| format!("Session '{reference}' not found"))
}

/// List stored sessions, most recent first.
///
/// ```bash
/// chatshelf sessions list
/// chatshelf sessions list --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let (_, registry) = load_registry(state).await?;
    let sessions = registry.list_ordered_by_recency();

    if json {
        let rows: Vec<_> = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| {
                serde_json::json!({
                    "position": i + 1,
                    "id": s.id,
                    "created_at": s.created_at,
                    "messages": s.messages.len(),
                    "preview": s.preview(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Start one with: {}",
            style("i").blue().bold(),
            style("chatshelf chat").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Session").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Preview").fg(Color::White),
    ]);

    for (i, session) in sessions.iter().enumerate() {
        let started = session
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&session.id).fg(Color::Cyan),
            Cell::new(started).fg(Color::White),
            Cell::new(session.messages.len().to_string()).fg(Color::White),
            Cell::new(session.preview()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print a session's transcript.
pub async fn show_session(state: &AppState, reference: &str, json: bool) -> Result<()> {
    let (_, registry) = load_registry(state).await?;
    let session = find_session(&registry, reference)?;

    if json {
        println!("{}", serde_json::to_string_pretty(session)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&session.id).cyan().bold());
    ChatRenderer::new(None).print_transcript(&session.messages);
    Ok(())
}

/// Delete one session with confirmation.
///
/// Deleting the last session leaves a fresh empty one behind.
pub async fn delete_session(state: &AppState, reference: &str, force: bool, json: bool) -> Result<()> {
    let (store, mut registry) = load_registry(state).await?;
    let (id, count) = {
        let session = find_session(&registry, reference)?;
        (session.id.clone(), session.messages.len())
    };

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' ({count} messages)?",
                style(&id).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    registry.delete(&id);
    if registry.is_empty() {
        let fresh = registry.create();
        registry.insert_front(fresh);
    }
    store
        .save(&registry.to_stored())
        .await
        .context("Failed to save chat history")?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "session_id": id}));
    } else {
        println!("  {} Session '{}' deleted.", style("x").red().bold(), id);
    }

    Ok(())
}

/// Delete every session, leaving one empty session.
pub async fn clear_sessions(state: &AppState, force: bool, json: bool) -> Result<()> {
    let (store, mut registry) = load_registry(state).await?;
    let count = registry.len();

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} stored session{}?",
                style(count).red().bold(),
                if count == 1 { "" } else { "s" }
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let fresh = registry.clear_all();
    store
        .save(&registry.to_stored())
        .await
        .context("Failed to save chat history")?;

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": count, "session_id": fresh})
        );
    } else {
        println!(
            "  {} Deleted {count} session{}. Now on '{fresh}'.",
            style("x").red().bold(),
            if count == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn registry() -> SessionRegistry {
        let mut registry = SessionRegistry::new();
        let older = Session::new(
            "Chat 2026-01-15 10:00:00",
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        );
        let newer = Session::new(
            "Chat 2026-01-15 10:05:00",
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 5, 0).unwrap(),
        );
        registry.insert_front(older);
        registry.insert_front(newer);
        registry
    }

    #[test]
    fn test_find_session_by_position_and_id() {
        let registry = registry();
        assert_eq!(
            find_session(&registry, "1").unwrap().id,
            "Chat 2026-01-15 10:05:00"
        );
        assert_eq!(
            find_session(&registry, "Chat 2026-01-15 10:00:00").unwrap().id,
            "Chat 2026-01-15 10:00:00"
        );
    }

    #[test]
    fn test_find_session_unknown() {
        let registry = registry();
        let err = find_session(&registry, "7").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
