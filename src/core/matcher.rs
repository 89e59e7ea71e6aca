/// Maximum Euclidean distance at which two embeddings count as the same
/// person. A system constant, not tunable per request.
pub const MATCH_TOLERANCE: f64 = 0.5;

/// One stored embedding. Gallery order is significant: matching walks the
/// list as stored and stops at the first hit, so earlier entries win when
/// several are within tolerance.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub employee_id: u64,
    pub embedding: Vec<f64>,
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Some(sum.sqrt())
}

/// First gallery entry within tolerance of the sample, or no match.
/// Entries whose dimensionality disagrees with the sample are skipped.
pub fn match_face(gallery: &[GalleryEntry], sample: &[f64]) -> Option<u64> {
    gallery
        .iter()
        .find(|entry| {
            euclidean_distance(&entry.embedding, sample)
                .is_some_and(|d| d <= MATCH_TOLERANCE)
        })
        .map(|entry| entry.employee_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(employee_id: u64, embedding: Vec<f64>) -> GalleryEntry {
        GalleryEntry {
            employee_id,
            embedding,
        }
    }

    #[test]
    fn nothing_matches_an_empty_gallery() {
        assert_eq!(match_face(&[], &[0.0, 0.0]), None);
    }

    #[test]
    fn distant_samples_do_not_match() {
        let gallery = [entry(1, vec![0.0, 0.0])];
        assert_eq!(match_face(&gallery, &[3.0, 4.0]), None);
    }

    #[test]
    fn distance_exactly_at_tolerance_matches() {
        let gallery = [entry(1, vec![0.0, 0.0])];
        assert_eq!(match_face(&gallery, &[0.5, 0.0]), Some(1));
        assert_eq!(match_face(&gallery, &[0.5001, 0.0]), None);
    }

    #[test]
    fn first_entry_within_tolerance_wins() {
        // Both entries are within tolerance of the sample; stored order
        // decides, not the smaller distance.
        let gallery = [entry(10, vec![0.3, 0.0]), entry(20, vec![0.0, 0.0])];
        assert_eq!(match_face(&gallery, &[0.0, 0.0]), Some(10));

        let reversed = [entry(20, vec![0.0, 0.0]), entry(10, vec![0.3, 0.0])];
        assert_eq!(match_face(&reversed, &[0.0, 0.0]), Some(20));
    }

    #[test]
    fn mismatched_dimensions_are_skipped() {
        let gallery = [entry(1, vec![0.0]), entry(2, vec![0.0, 0.0])];
        assert_eq!(match_face(&gallery, &[0.0, 0.0]), Some(2));
    }
}
