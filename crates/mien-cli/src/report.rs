//! Registration-log reporting.
//!
//! Answers simple questions about who is registered, either as a structured
//! summary or via keyword dispatch over a free-text query. Purely local;
//! never calls out to anything beyond the store.

use anyhow::Result;
use mien_core::store::{FaceStore, StoredFace};
use serde_json::json;

/// How many entries a listing includes at most.
const LISTING_LIMIT: u32 = 20;

/// Produce the log report: a structured summary when no query is given,
/// otherwise a keyword-dispatched natural-language answer.
pub fn answer<S: FaceStore>(store: &S, query: Option<&str>) -> Result<serde_json::Value> {
    match query {
        None => summary(store),
        Some(query) => keyword_answer(store, query),
    }
}

fn summary<S: FaceStore>(store: &S) -> Result<serde_json::Value> {
    let count = store.count()?;
    let latest = store.latest()?;
    let entries = store.recent(LISTING_LIMIT)?;
    Ok(json!({
        "count": count,
        "latest": latest,
        "entries": entries,
    }))
}

fn keyword_answer<S: FaceStore>(store: &S, query: &str) -> Result<serde_json::Value> {
    let query_lower = query.to_lowercase();

    let response = if query_lower.contains("last person") || query_lower.contains("latest") {
        match store.latest()? {
            Some(face) => format!(
                "The last person registered was {} at {}.",
                face.name,
                face.created_at.to_rfc3339()
            ),
            None => no_data_response(),
        }
    } else if query_lower.contains("how many") || query_lower.contains("count") {
        let count = store.count()?;
        match count {
            0 => no_data_response(),
            1 => "There is 1 person registered.".to_string(),
            n => format!("There are {n} people registered."),
        }
    } else {
        // no keyword matched: fall back to listing the log
        let entries = store.recent(LISTING_LIMIT)?;
        if entries.is_empty() {
            no_data_response()
        } else {
            let lines: Vec<String> = entries.iter().map(describe).collect();
            format!("Registered faces:\n{}", lines.join("\n"))
        }
    };

    Ok(json!({ "response": response }))
}

fn describe(face: &StoredFace) -> String {
    format!(
        "Person ID: {}, Name: {}, Registered at: {}",
        face.id,
        face.name,
        face.created_at.to_rfc3339()
    )
}

fn no_data_response() -> String {
    "I don't have any face registration data to answer questions about yet. \
     Please register some faces first."
        .to_string()
}
