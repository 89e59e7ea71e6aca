use anyhow::{Result, anyhow};
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

use crate::core::matcher::GalleryEntry;
use crate::model::face_encoding::{FaceEncoding, decode_embedding};

/// In-memory copy of the face gallery, ordered by encoding id ascending.
/// Matching is first-hit-wins, so the order here is part of the matching
/// semantics and must follow the stored order.
static GALLERY: Lazy<RwLock<Vec<GalleryEntry>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Snapshot for one matching pass.
pub fn snapshot() -> Vec<GalleryEntry> {
    GALLERY.read().expect("gallery poisoned").clone()
}

/// Append a freshly enrolled embedding (new encodings get the highest id,
/// so appending preserves stored order).
pub fn insert(entry: GalleryEntry) {
    GALLERY.write().expect("gallery poisoned").push(entry);
}

/// Drop every embedding belonging to a removed employee.
pub fn remove_employee(employee_id: u64) {
    GALLERY
        .write()
        .expect("gallery poisoned")
        .retain(|e| e.employee_id != employee_id);
}

/// Load the gallery from the database, streaming in batches.
pub async fn warmup_gallery(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, FaceEncoding>("SELECT * FROM face_encodings ORDER BY id ASC")
            .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;
    let mut skipped = 0usize;

    while let Some(row) = stream.next().await {
        let row = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        match decode_embedding(&row.encoding) {
            Some(embedding) => {
                batch.push(GalleryEntry {
                    employee_id: row.employee_id,
                    embedding,
                });
                total += 1;
            }
            None => skipped += 1,
        }

        if batch.len() == batch_size {
            insert_batch(&mut batch);
        }
    }

    if !batch.is_empty() {
        insert_batch(&mut batch);
    }

    if skipped > 0 {
        log::warn!("Gallery warmup skipped {} malformed encodings", skipped);
    }
    log::info!("Gallery warmup complete: {} encodings", total);
    Ok(())
}

fn insert_batch(batch: &mut Vec<GalleryEntry>) {
    GALLERY
        .write()
        .expect("gallery poisoned")
        .append(batch);
}
