#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Recommender.
//!
//! Builds mean-vectors over a user's favourited and disliked papers and
//! scores every other linked paper by `cos(v, μ_F) − cos(v, μ_D)`,
//! surfacing the top candidates as newly "Recommended"-tagged links.
//!
//! Built on `paperwright_vectorstore::cosine_similarity` for the scoring
//! primitive and `paperwright_database::queries::recommender` for the
//! level-tag bucket queries backing the favourites/dislikes sets. The
//! centroid/scoring logic is a thin, literal implementation of the
//! underlying formula.

use paperwright_database::DbError;
use paperwright_database::queries::recommender as queries;
use paperwright_models::level_tag;
use paperwright_vectorstore::{VectorStore, VectorStoreError, cosine_similarity};
use switchy_database::Database;
use thiserror::Error;

/// Errors from running the recommender.
#[derive(Debug, Error)]
pub enum RecommenderError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Vector store call failed.
    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// "≤10 most recent" window for both the favourites and dislikes sets.
/// A named constant rather than a configuration surface, since nothing
/// else in the workspace needs it tunable.
pub const RECOMMENDER_WINDOW: u32 = 10;

/// The recommender always tops candidates up to this many total
/// "Recommended"-tagged links.
pub const RECOMMENDED_TARGET: usize = 5;

/// Runs the recommender for `user_id`, tagging up to
/// `RECOMMENDED_TARGET - existing_recommended_count` candidates with
/// "Recommended" and returning their `user_paper_link` ids in descending
/// score order.
///
/// # Errors
///
/// Returns [`RecommenderError`] if the database or vector store is
/// unreachable.
pub async fn recommend(
    db: &dyn Database,
    vector_store: &dyn VectorStore,
    user_id: i64,
) -> Result<Vec<i64>, RecommenderError> {
    let favourites = queries::paper_ids_with_tag(db, user_id, level_tag::FAVOURITE, RECOMMENDER_WINDOW).await?;
    let dislikes = queries::paper_ids_with_tag(db, user_id, level_tag::NOT_INTERESTED, RECOMMENDER_WINDOW).await?;
    let candidates = queries::candidate_links(db, user_id).await?;
    let already_recommended = queries::recommended_count(db, user_id).await?;

    let slots = RECOMMENDED_TARGET.saturating_sub(already_recommended as usize);
    if slots == 0 || candidates.is_empty() {
        return Ok(Vec::new());
    }

    let favourite_vectors = fetch_vectors(vector_store, user_id, &favourites).await?;
    let dislike_vectors = fetch_vectors(vector_store, user_id, &dislikes).await?;

    let mu_f = centroid(&favourite_vectors);
    let mu_d = if dislike_vectors.is_empty() { None } else { Some(centroid(&dislike_vectors)) };

    let mut scored: Vec<(i64, i64, f32)> = Vec::with_capacity(candidates.len());
    let conditions: Vec<(i64, i64)> = candidates.iter().map(|(_, paper_id)| (user_id, *paper_id)).collect();
    let vectors = vector_store.get_embeddings(&conditions).await?;

    for (link_id, paper_id) in &candidates {
        let Some(vector) = vectors.get(&(user_id, *paper_id)) else {
            continue;
        };
        let favourite_score = mu_f.as_ref().map_or(0.0, |mu| cosine_similarity(vector, mu));
        let dislike_score = mu_d.as_ref().map_or(0.0, |mu| cosine_similarity(vector, mu));
        scored.push((*link_id, *paper_id, favourite_score - dislike_score));
    }

    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(slots);

    let mut recommended_ids = Vec::with_capacity(scored.len());
    for (link_id, _, _) in &scored {
        queries::add_tag(db, *link_id, level_tag::RECOMMENDED).await?;
        recommended_ids.push(*link_id);
    }

    Ok(recommended_ids)
}

/// Fetches raw vectors for `(user_id, paper_id)` pairs, silently skipping
/// any paper with no stored vector yet rather than failing the whole
/// recommendation run over one missing embedding.
async fn fetch_vectors(
    vector_store: &dyn VectorStore,
    user_id: i64,
    paper_ids: &[i64],
) -> Result<Vec<Vec<f32>>, RecommenderError> {
    if paper_ids.is_empty() {
        return Ok(Vec::new());
    }
    let conditions: Vec<(i64, i64)> = paper_ids.iter().map(|pid| (user_id, *pid)).collect();
    let fetched = vector_store.get_embeddings(&conditions).await?;
    Ok(conditions.iter().filter_map(|key| fetched.get(key).cloned()).collect())
}

/// Mean vector across `vectors`. Callers only invoke this with a
/// non-empty slice (`μ_D` is `None`, not a zero vector, when dislikes is
/// empty).
fn centroid(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    let mut sum = vec![0.0f32; dim];
    for vector in vectors {
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let count = vectors.len() as f32;
    for value in &mut sum {
        *value /= count;
    }
    Some(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_averages_component_wise() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let mu = centroid(&vectors).expect("non-empty");
        assert!((mu[0] - 0.5).abs() < f32::EPSILON);
        assert!((mu[1] - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn centroid_of_empty_is_none() {
        assert!(centroid(&[]).is_none());
    }
}
