//! Commands that talk to the collection API.

use safekey_core::{FlushOutcome, StorageConfig};
use std::sync::Arc;

use crate::scripted::{open_engine, ScriptedSurface};

pub fn register(storage: &StorageConfig, email: String, child_age: String) -> Result<(), String> {
    let engine = open_engine(storage, Arc::new(ScriptedSurface::default()))?;
    engine.register(email, child_age).map_err(|e| e.to_string())?;
    println!("Registered installation {}", engine.user_id());
    Ok(())
}

pub fn flush(storage: &StorageConfig) -> Result<(), String> {
    let engine = open_engine(storage, Arc::new(ScriptedSurface::default()))?;
    let outcome = engine.flush_now();
    println!("{}", describe(&outcome));
    match outcome {
        FlushOutcome::Rejected { .. } | FlushOutcome::Failed { .. } => {
            Err("upload did not complete".to_string())
        }
        _ => Ok(()),
    }
}

pub fn describe(outcome: &FlushOutcome) -> String {
    match outcome {
        FlushOutcome::GateClosed { records, lines } => format!(
            "Nothing sent: {} records / {} lines do not clear the batch gates",
            records, lines
        ),
        FlushOutcome::Sent { records, retained } => {
            format!("Uploaded {} records ({} kept for next batch)", records, retained)
        }
        FlushOutcome::Rejected { status } => format!("Endpoint rejected batch: HTTP {}", status),
        FlushOutcome::Failed { reason } => format!("Upload failed: {}", reason),
        FlushOutcome::Superseded => "Uploaded; queue was already cleared".to_string(),
    }
}
