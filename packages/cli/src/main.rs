#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive operator CLI for the paperwright backend.
//!
//! Provides a unified entry point (`cargo paperwright`) that lets an
//! operator interactively select a maintenance operation: running
//! migrations, seeding the built-in default prompts, bulk-regenerating
//! summaries and tags for a user's corpus, or starting the HTTP server.

use std::collections::HashMap;

use dialoguer::{Input, Select};
use paperwright_cli_utils::{IndicatifProgress, MultiProgress, ProgressCallback};
use paperwright_database::db::connect_from_env;
use paperwright_database::queries::{links, papers, seed, users};
use paperwright_database::run_migrations;
use paperwright_database_models::{DefaultSummaryKey, UserRow};
use paperwright_jobs::JobRegistry;
use paperwright_llm::gateway::{Gateway, InvokeOptions};
use paperwright_models::{Character, PromptType};
use paperwright_summaries::coordinator::{self, DefaultTable};
use paperwright_summaries::{bulk, paper_context};
use paperwright_tagging::TaggingOutcome;
use switchy_database::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = paperwright_cli_utils::init_logger();
    println!("Paperwright Toolchain");
    println!();

    let tools = &[
        "Run database migrations",
        "Seed default prompts",
        "Bulk-regenerate summaries & tags for a user",
        "Start server",
    ];
    let selection = Select::new()
        .with_prompt("What would you like to do?")
        .items(tools)
        .default(0)
        .interact()?;

    match selection {
        0 => run_migrations_interactive().await?,
        1 => seed_prompts_interactive().await?,
        2 => bulk_regenerate_interactive(&multi).await?,
        3 => {
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(async {
                    let state = paperwright_server::AppState::from_env()
                        .await
                        .map_err(std::io::Error::other)?;
                    paperwright_server::interactive::run(state).await
                })
            })
            .await??;
        }
        _ => unreachable!(),
    }

    Ok(())
}

async fn run_migrations_interactive() -> Result<(), Box<dyn std::error::Error>> {
    let db = connect_from_env().await?;
    run_migrations(db.as_ref()).await?;
    println!("Migrations applied.");
    Ok(())
}

async fn seed_prompts_interactive() -> Result<(), Box<dyn std::error::Error>> {
    let db = connect_from_env().await?;
    let seeded = seed::seed_default_prompts(db.as_ref()).await?;
    println!("Seeded {seeded} default prompt(s).");
    Ok(())
}

/// Regenerates the default-character summary and tags for every paper
/// linked to a user, reusing [`bulk::run_bulk`]'s bounded fan-out (the
/// same machinery the HTTP bulk-generate endpoint drives in the
/// background) one paper at a time against the whole corpus.
async fn bulk_regenerate_interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let user_id: i64 = Input::new().with_prompt("User id").interact_text()?;

    let db = connect_from_env().await?;
    let gateway = Gateway::from_env()?;
    let user = users::get_or_create(db.as_ref(), user_id).await?;
    let paper_ids = links::list_paper_ids(db.as_ref(), user_id).await?;

    if paper_ids.is_empty() {
        println!("User {user_id} has no linked papers.");
        return Ok(());
    }

    let progress = IndicatifProgress::batch_bar(multi, "Regenerating summaries & tags");
    progress.set_total(paper_ids.len() as u64);

    let registry = JobRegistry::new();
    let (provider, model) = gateway.primary_route();
    let (provider, model) = (provider.to_string(), model.to_string());

    let items: Vec<bulk::BulkItem> = paper_ids
        .into_iter()
        .map(|paper_id| bulk::BulkItem { paper_id, prompt_ids: vec![] })
        .collect();

    let results = bulk::run_bulk(&registry, user_id, items, 4, |item| {
        let db = db.as_ref();
        let gateway = &gateway;
        let user = &user;
        let provider = provider.clone();
        let model = model.clone();
        let progress = progress.clone();
        async move {
            let outcome = regenerate_one(db, gateway, user, item.paper_id, &provider, &model).await;
            progress.inc(1);
            match outcome {
                Ok(()) => bulk::BulkItemResult {
                    paper_id: item.paper_id,
                    succeeded_prompt_ids: vec![0],
                    failed: vec![],
                },
                Err(message) => bulk::BulkItemResult {
                    paper_id: item.paper_id,
                    succeeded_prompt_ids: vec![],
                    failed: vec![(0, message)],
                },
            }
        }
    })
    .await;

    let failed = results.iter().filter(|r| !r.failed.is_empty()).count();
    progress.finish(format!("{} paper(s) regenerated, {failed} failed", results.len()));

    for result in &results {
        for (_, message) in &result.failed {
            log::warn!("paper {}: {message}", result.paper_id);
        }
    }

    Ok(())
}

async fn regenerate_one(
    db: &dyn Database,
    gateway: &Gateway,
    user: &UserRow,
    paper_id: i64,
    provider: &str,
    model: &str,
) -> Result<(), String> {
    let paper = papers::get_paper(db, paper_id).await.map_err(|e| e.to_string())?;
    let link = links::upsert_link(db, user.id, paper_id).await.map_err(|e| e.to_string())?;

    let placeholders = HashMap::new();
    let resolved = paperwright_prompts::resolve(
        db,
        PromptType::Summary,
        user.id,
        None,
        Character::None,
        &user.display_name,
        &placeholders,
    )
    .await
    .map_err(|e| e.to_string())?;

    let key = DefaultSummaryKey {
        paper_id,
        llm_provider: provider.to_string(),
        llm_model: model.to_string(),
        character: Character::None,
        affinity: 0,
    };
    let user_content = paper_context(&paper.title, &paper.abstract_text, paper.full_text.as_deref());

    coordinator::ensure_ready::<DefaultTable>(db, gateway, &key, &resolved.body, &user_content, &InvokeOptions::default(), None)
        .await
        .map_err(|e| e.to_string())?;

    match paperwright_tagging::tag_paper(db, gateway, link.id, user.id, paper_id, &link.tags, true)
        .await
        .map_err(|e| e.to_string())?
    {
        TaggingOutcome::Tagged(_) | TaggingOutcome::SkippedAlreadyTagged | TaggingOutcome::Failed => Ok(()),
    }
}
