//! HTTP handler functions for the paperwright API.

use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, web};
use paperwright_database::queries::{links, paper_chat, papers, prompts, research, summaries as summary_queries, users};
use paperwright_database_models::{CustomSummaryKey, CustomSummaryRow, DefaultSummaryKey, DefaultSummaryRow, UserPaperLinkRow, UserRow};
use paperwright_llm::gateway::InvokeOptions;
use paperwright_models::{Character, PromptType};
use paperwright_rag::Reference;
use paperwright_research::ToolFlavor;
use paperwright_server_models::{
    ApiHealth, ApiReference, ApiResearchMessage, ApiSummary, ApiUser, BulkProgressResponse,
    CheckDuplicationsQuery, CheckDuplicationsResponse, CheckExistingSummaryRequest, CheckExistingSummaryResponse,
    GenerateBulkRequest, GenerateBulkResponse, GenerateSummaryRequest, ImportFromArxivRequest, ImportFromArxivResponse,
    RagQueryRequest, RagQueryResponse, RecommendResponse, ResearchStatusResponse, SetCharacterRequest,
    StartResearchRequest, StartResearchResponse,
};
use paperwright_summaries::coordinator::{self, CustomTable, DefaultTable};
use paperwright_summaries::selection::{self, Candidate, Selection, SelectionMode};
use paperwright_summaries::{bulk, paper_context};
use paperwright_vectorstore::{SummaryKind as VectorSummaryKind, VectorMetadata, stable_id};
use switchy_database::Database;

use crate::{Actor, ApiError, AppState};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/me`
pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let user = users::get_or_create(state.db.as_ref(), actor.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiUser::from(user)))
}

/// `POST /api/me/character`
pub async fn set_character(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SetCharacterRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    users::get_or_create(state.db.as_ref(), actor.user_id).await?;
    users::set_selected_character(state.db.as_ref(), actor.user_id, Character::from(body.character)).await?;
    let user = users::get_or_create(state.db.as_ref(), actor.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiUser::from(user)))
}

/// `GET /api/papers/check_duplications`
pub async fn check_duplications(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<CheckDuplicationsQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let paper = papers::get_paper_by_external_id(state.db.as_ref(), &query.external_id).await?;

    let response = match &paper {
        None => CheckDuplicationsResponse {
            paper_id: None,
            already_linked: false,
        },
        Some(p) => {
            let link = links::get_link(state.db.as_ref(), actor.user_id, p.id).await?;
            CheckDuplicationsResponse {
                paper_id: Some(p.id),
                already_linked: link.is_some(),
            }
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

/// `POST /api/papers/check_existing_summary`
pub async fn check_existing_summary(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CheckExistingSummaryRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let user = users::get_or_create(state.db.as_ref(), actor.user_id).await?;
    let (provider, model) = primary_route(&state);
    let character = user.selected_character;
    let affinity = affinity_for(&user, character);

    let response = match body.prompt_id {
        None => {
            let key = DefaultSummaryKey {
                paper_id: body.paper_id,
                llm_provider: provider,
                llm_model: model,
                character,
                affinity,
            };
            match summary_queries::get_default_summary(state.db.as_ref(), &key).await? {
                Some(row) if summary_queries::parse_processing_n(&row.body).is_none() => CheckExistingSummaryResponse {
                    exists: true,
                    requires_regeneration: false,
                    summary: Some(default_row_to_api(&row)),
                },
                _ => not_found_summary(),
            }
        }
        Some(prompt_id) => {
            let key = CustomSummaryKey {
                user_id: user.id,
                paper_id: body.paper_id,
                prompt_id,
                llm_provider: provider,
                llm_model: model,
                character,
                affinity,
            };
            match summary_queries::get_custom_summary(state.db.as_ref(), &key).await? {
                Some(row) if summary_queries::parse_processing_n(&row.body).is_none() => {
                    let prompt = prompts::get_prompt(state.db.as_ref(), prompt_id).await?;
                    CheckExistingSummaryResponse {
                        exists: true,
                        requires_regeneration: prompt.updated_at > row.prompt_updated_at,
                        summary: Some(custom_row_to_api(&row)),
                    }
                }
                _ => not_found_summary(),
            }
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

fn not_found_summary() -> CheckExistingSummaryResponse {
    CheckExistingSummaryResponse {
        exists: false,
        requires_regeneration: false,
        summary: None,
    }
}

/// `POST /api/papers/import_from_arxiv`
///
/// Ingests an already-fetched paper, generates its default summaries (with
/// and without the user's selected character persona), tags it, and
/// vectorises whichever summary the Selection Policy prefers.
pub async fn import_from_arxiv(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ImportFromArxivRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let user = users::get_or_create(state.db.as_ref(), actor.user_id).await?;

    let paper = papers::upsert_paper(
        state.db.as_ref(),
        &body.external_id,
        &body.url,
        &body.title,
        &body.authors,
        &body.abstract_text,
    )
    .await?;
    if let Some(full_text) = &body.full_text {
        papers::set_full_text(state.db.as_ref(), paper.id, full_text).await?;
    }

    let link = links::upsert_link(state.db.as_ref(), user.id, paper.id).await?;

    let (provider, model) = primary_route(&state);
    let placeholders = HashMap::new();
    let user_content = paper_context(&paper.title, &paper.abstract_text, body.full_text.as_deref());

    let resolved_none = paperwright_prompts::resolve(
        state.db.as_ref(),
        PromptType::Summary,
        user.id,
        body.prompt_id,
        Character::None,
        &user.display_name,
        &placeholders,
    )
    .await?;

    let key_none = DefaultSummaryKey {
        paper_id: paper.id,
        llm_provider: provider.clone(),
        llm_model: model.clone(),
        character: Character::None,
        affinity: 0,
    };

    let selected_character = user.selected_character;
    let (key_selected, system_prompt_selected) = if selected_character == Character::None {
        (None, None)
    } else {
        let resolved = paperwright_prompts::resolve(
            state.db.as_ref(),
            PromptType::Summary,
            user.id,
            body.prompt_id,
            selected_character,
            &user.display_name,
            &placeholders,
        )
        .await?;
        let key = DefaultSummaryKey {
            paper_id: paper.id,
            llm_provider: provider.clone(),
            llm_model: model.clone(),
            character: selected_character,
            affinity: affinity_for(&user, selected_character),
        };
        (Some(key), Some(resolved.body))
    };

    let outcome = coordinator::ensure_ready_dual::<DefaultTable>(
        state.db.as_ref(),
        &state.gateway,
        &key_none,
        key_selected.as_ref(),
        &resolved_none.body,
        system_prompt_selected.as_deref(),
        &user_content,
        &InvokeOptions::default(),
        None,
    )
    .await?;

    let mut candidates = vec![Candidate::Default(outcome.none.clone())];
    if let Some(selected) = outcome.selected.clone() {
        candidates.push(Candidate::Default(selected));
    }
    let selection = selection::select(&candidates, selected_character, SelectionMode::Initial, None)
        .unwrap_or(Selection::Default(outcome.none.id));

    apply_selection(state.db.as_ref(), link.id, selection).await?;

    let chosen = match selection {
        Selection::Default(id) if id == outcome.none.id => &outcome.none,
        Selection::Default(_) => outcome.selected.as_ref().unwrap_or(&outcome.none),
        Selection::Custom(_) => &outcome.none,
    };

    let tagging_outcome = paperwright_tagging::tag_paper(
        state.db.as_ref(),
        &state.gateway,
        link.id,
        user.id,
        paper.id,
        &link.tags,
        false,
    )
    .await?;
    let tags = match tagging_outcome {
        paperwright_tagging::TaggingOutcome::Tagged(tags) => tags,
        _ => Vec::new(),
    };

    vectorize_selection(&state, user.id, paper.id, &tags.join(","), selection).await?;

    Ok(HttpResponse::Ok().json(ImportFromArxivResponse {
        paper_id: paper.id,
        link_id: link.id,
        default_summary: default_row_to_api(chosen),
        custom_summary: None,
        tags,
    }))
}

/// `GET /api/papers/recommend`
pub async fn recommend(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let recommended_link_ids =
        paperwright_recommender::recommend(state.db.as_ref(), state.vector_store.as_ref(), actor.user_id).await?;
    Ok(HttpResponse::Ok().json(RecommendResponse { recommended_link_ids }))
}

/// `POST /api/papers/{paper_id}/summaries/generate`
pub async fn generate_single_summary(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<GenerateSummaryRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let user = users::get_or_create(state.db.as_ref(), actor.user_id).await?;
    let paper_id = path.into_inner();
    let paper = papers::get_paper(state.db.as_ref(), paper_id).await?;
    let link = links::get_link(state.db.as_ref(), user.id, paper_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no link between user {} and paper {paper_id}", user.id)))?;

    let (provider, model) = primary_route(&state);
    let placeholders = HashMap::new();
    let user_content = paper_context(&paper.title, &paper.abstract_text, paper.full_text.as_deref());
    let character = user.selected_character;
    let affinity = affinity_for(&user, character);
    let current = current_selection(&link);

    let (selection, summary) = match body.prompt_id {
        None => {
            let resolved = paperwright_prompts::resolve(
                state.db.as_ref(),
                PromptType::Summary,
                user.id,
                None,
                character,
                &user.display_name,
                &placeholders,
            )
            .await?;
            let key = DefaultSummaryKey {
                paper_id,
                llm_provider: provider,
                llm_model: model,
                character,
                affinity,
            };
            let row = coordinator::ensure_ready::<DefaultTable>(
                state.db.as_ref(),
                &state.gateway,
                &key,
                &resolved.body,
                &user_content,
                &InvokeOptions::default(),
                None,
            )
            .await?;
            let selection = selection::select(&[Candidate::Default(row.clone())], character, SelectionMode::RegenerateDetail, current)
                .unwrap_or(Selection::Default(row.id));
            (selection, default_row_to_api(&row))
        }
        Some(prompt_id) => {
            let resolved = paperwright_prompts::resolve(
                state.db.as_ref(),
                PromptType::Summary,
                user.id,
                Some(prompt_id),
                character,
                &user.display_name,
                &placeholders,
            )
            .await?;
            let key = CustomSummaryKey {
                user_id: user.id,
                paper_id,
                prompt_id: resolved.source_prompt_id,
                llm_provider: provider,
                llm_model: model,
                character,
                affinity,
            };
            let row = coordinator::ensure_ready::<CustomTable>(
                state.db.as_ref(),
                &state.gateway,
                &key,
                &resolved.body,
                &user_content,
                &InvokeOptions::default(),
                Some(resolved.source_updated_at),
            )
            .await?;
            let selection = selection::select(&[Candidate::Custom(row.clone())], character, SelectionMode::RegenerateDetail, current)
                .unwrap_or(Selection::Custom(row.id));
            (selection, custom_row_to_api(&row))
        }
    };

    apply_selection(state.db.as_ref(), link.id, selection).await?;
    vectorize_selection(&state, user.id, paper_id, &link.tags, selection).await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// `POST /api/papers/summaries/generate_bulk`
///
/// Accepted immediately; the actual generation runs in the background and
/// is polled via [`bulk_progress`].
pub async fn generate_multiple_summaries_parallel(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<GenerateBulkRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let user_id = actor.user_id;
    let user = users::get_or_create(state.db.as_ref(), user_id).await?;

    let items: Vec<bulk::BulkItem> = body
        .items
        .iter()
        .map(|i| bulk::BulkItem {
            paper_id: i.paper_id,
            prompt_ids: i.prompt_ids.clone(),
        })
        .collect();
    let concurrency = body.concurrency.unwrap_or(4).max(1);

    let character = user.selected_character;
    let affinity = affinity_for(&user, character);
    let (provider, model) = primary_route(&state);
    let display_name = user.display_name.clone();
    let state = state.into_inner();

    tokio::spawn(async move {
        bulk::run_bulk(&state.jobs, user_id, items, concurrency, move |item| {
            let state = state.clone();
            let display_name = display_name.clone();
            let provider = provider.clone();
            let model = model.clone();
            async move {
                bulk::dispatch_paper(item, concurrency, move |paper_id, prompt_id| {
                    let state = state.clone();
                    let display_name = display_name.clone();
                    let provider = provider.clone();
                    let model = model.clone();
                    async move {
                        generate_bulk_item(&state, user_id, &display_name, character, affinity, provider, model, paper_id, prompt_id).await
                    }
                })
                .await
            }
        })
        .await;
    });

    Ok(HttpResponse::Accepted().json(GenerateBulkResponse { accepted: true }))
}

#[allow(clippy::too_many_arguments)]
async fn generate_bulk_item(
    state: &AppState,
    user_id: i64,
    display_name: &str,
    character: Character,
    affinity: u8,
    provider: String,
    model: String,
    paper_id: i64,
    prompt_id: i64,
) -> Result<(), paperwright_summaries::SummaryError> {
    let paper = papers::get_paper(state.db.as_ref(), paper_id).await?;
    let placeholders = HashMap::new();
    let resolved = paperwright_prompts::resolve(
        state.db.as_ref(),
        PromptType::Summary,
        user_id,
        Some(prompt_id),
        character,
        display_name,
        &placeholders,
    )
    .await?;
    let user_content = paper_context(&paper.title, &paper.abstract_text, paper.full_text.as_deref());

    let key = CustomSummaryKey {
        user_id,
        paper_id,
        prompt_id: resolved.source_prompt_id,
        llm_provider: provider,
        llm_model: model,
        character,
        affinity,
    };
    let row = coordinator::ensure_ready::<CustomTable>(
        state.db.as_ref(),
        &state.gateway,
        &key,
        &resolved.body,
        &user_content,
        &InvokeOptions::default(),
        Some(resolved.source_updated_at),
    )
    .await?;

    if let Some(link) = links::get_link(state.db.as_ref(), user_id, paper_id).await? {
        let current = current_selection(&link);
        if let Some(selection) = selection::select(&[Candidate::Custom(row.clone())], character, SelectionMode::RegenerateAdd, current) {
            apply_selection(state.db.as_ref(), link.id, selection)
                .await
                .map_err(|_| paperwright_summaries::SummaryError::Inconsistent("bulk selection apply"))?;
            vectorize_selection(state, user_id, paper_id, &link.tags, selection)
                .await
                .map_err(|_| paperwright_summaries::SummaryError::Inconsistent("bulk selection vectorize"))?;
        }
    }

    Ok(())
}

/// `GET /api/auth/character-selection-bulk-update-progress`
pub async fn bulk_progress(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let status = state.jobs.status(actor.user_id);
    Ok(HttpResponse::Ok().json(BulkProgressResponse {
        is_running: status.is_running,
        total: status.total,
        processed: status.processed,
        eta_seconds: status.eta_seconds(),
        last_error: status.last_error,
    }))
}

/// `POST /api/research/start` — the full five-role Research Graph with web
/// search/extract tools.
pub async fn deepresearch_start(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<StartResearchRequest>,
) -> Result<HttpResponse, ApiError> {
    start_research_session(req, state, body, ToolFlavor::Research).await
}

/// `POST /api/rag/start_async` — the same Research Graph restricted to
/// `corpus_search` over the user's own papers.
pub async fn deeprag_start(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<StartResearchRequest>,
) -> Result<HttpResponse, ApiError> {
    start_research_session(req, state, body, ToolFlavor::Rag).await
}

async fn start_research_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<StartResearchRequest>,
    flavor: ToolFlavor,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let user = users::get_or_create(state.db.as_ref(), actor.user_id).await?;

    let title: String = body.query.chars().take(120).collect();
    let session = research::create_session(state.db.as_ref(), user.id, &title).await?;
    let session_id = session.id;

    let user_id = user.id;
    let display_name = user.display_name.clone();
    let character = user.selected_character;
    let query = body.query.clone();
    let tags = body.tags.clone();
    let prompt_group_name = "default".to_string();
    let prompt_group_category = flavor_category(flavor).to_string();
    let state = state.into_inner();

    tokio::spawn(async move {
        let prompt_group = match prompts::get_prompt_group(state.db.as_ref(), user_id, &prompt_group_name, &prompt_group_category).await
        {
            Ok(group) => group,
            Err(e) => {
                log::error!("research session {session_id}: failed to load prompt group: {e}");
                None
            }
        };

        if let Err(e) = paperwright_research::run_research(
            state.db.as_ref(),
            &state.gateway,
            state.vector_store.as_ref(),
            state.embedder.as_ref(),
            state.web_tools.as_ref(),
            session_id,
            user_id,
            &display_name,
            character,
            flavor,
            &tags,
            prompt_group.as_ref(),
            &query,
        )
        .await
        {
            log::error!("research session {session_id} failed: {e}");
        }
    });

    Ok(HttpResponse::Accepted().json(StartResearchResponse { session_id }))
}

const fn flavor_category(flavor: ToolFlavor) -> &'static str {
    match flavor {
        ToolFlavor::Research => "research",
        ToolFlavor::Rag => "rag",
    }
}

/// `GET /api/research/{session_id}/status`
pub async fn research_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    fetch_research_status(req, state, path).await
}

/// `GET /api/rag/{session_id}/status` — the Rag-flavoured Research Graph
/// shares the same session/message storage as [`research_status`].
pub async fn rag_status(req: HttpRequest, state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, ApiError> {
    fetch_research_status(req, state, path).await
}

async fn fetch_research_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let _actor = Actor::from_request(&req)?;
    let session_id = path.into_inner();
    let session = research::get_session(state.db.as_ref(), session_id).await?;
    let messages = research::list_messages(state.db.as_ref(), session_id).await?;
    Ok(HttpResponse::Ok().json(ResearchStatusResponse {
        status: session.processing_status.to_string(),
        messages: messages.into_iter().map(ApiResearchMessage::from).collect(),
    }))
}

/// `POST /api/rag/query` — a single bounded question/answer turn over one
/// paper's chat thread, using the RAG Agent Graph (`paperwright_rag`).
pub async fn rag_query(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RagQueryRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = Actor::from_request(&req)?;
    let session = paper_chat::create_session(state.db.as_ref(), actor.user_id, body.paper_id).await?;

    let outcome = paperwright_rag::run_rag(
        state.db.as_ref(),
        &state.gateway,
        state.vector_store.as_ref(),
        state.embedder.as_ref(),
        state.web_tools.as_ref(),
        session.id,
        actor.user_id,
        &body.tags,
        &body.question,
    )
    .await?;

    let references = outcome
        .references
        .into_iter()
        .map(|r| match r {
            Reference::Paper { paper_id } => ApiReference {
                kind: "paper".to_string(),
                paper_id: Some(paper_id),
                title: None,
                url: None,
            },
            Reference::Web { title, url } => ApiReference {
                kind: "web".to_string(),
                paper_id: None,
                title: Some(title),
                url: Some(url),
            },
        })
        .collect();

    Ok(HttpResponse::Ok().json(RagQueryResponse {
        answer: outcome.answer,
        references,
    }))
}

fn primary_route(state: &AppState) -> (String, String) {
    let (provider, model) = state.gateway.primary_route();
    (provider.to_string(), model.to_string())
}

const fn affinity_for(user: &UserRow, character: Character) -> u8 {
    match character {
        Character::A => user.affinity_a,
        Character::B => user.affinity_b,
        Character::None => 0,
    }
}

fn current_selection(link: &UserPaperLinkRow) -> Option<Selection> {
    if let Some(id) = link.selected_custom_summary_id {
        Some(Selection::Custom(id))
    } else {
        link.selected_default_summary_id.map(Selection::Default)
    }
}

async fn apply_selection(db: &dyn Database, link_id: i64, selection: Selection) -> Result<(), ApiError> {
    match selection {
        Selection::Default(id) => links::set_selected_summary(db, link_id, Some(id), None).await?,
        Selection::Custom(id) => links::set_selected_summary(db, link_id, None, Some(id)).await?,
    }
    Ok(())
}

async fn vectorize_selection(
    state: &AppState,
    user_id: i64,
    paper_id: i64,
    tags: &str,
    selection: Selection,
) -> Result<(), ApiError> {
    let tags_vec: Vec<String> = tags.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect();

    let (body, metadata) = match selection {
        Selection::Default(id) => {
            let row = summary_queries::get_default_summary_by_id(state.db.as_ref(), id).await?;
            let metadata = VectorMetadata {
                user_id,
                paper_id,
                summary_type: VectorSummaryKind::Default,
                default_summary_id: Some(row.id),
                custom_summary_id: None,
                llm_provider: row.llm_provider.clone(),
                llm_model: row.llm_model.clone(),
                tags: tags_vec,
            };
            (row.body, metadata)
        }
        Selection::Custom(id) => {
            let row = summary_queries::get_custom_summary_by_id(state.db.as_ref(), id).await?;
            let metadata = VectorMetadata {
                user_id,
                paper_id,
                summary_type: VectorSummaryKind::Custom,
                default_summary_id: None,
                custom_summary_id: Some(row.id),
                llm_provider: row.llm_provider.clone(),
                llm_model: row.llm_model.clone(),
                tags: tags_vec,
            };
            (row.body, metadata)
        }
    };

    let embedding = state.embedder.embed(&body).await?;
    state.vector_store.add(Some(stable_id(user_id, paper_id)), &body, embedding, metadata).await?;
    Ok(())
}

fn default_row_to_api(row: &DefaultSummaryRow) -> ApiSummary {
    ApiSummary {
        id: row.id,
        is_custom: false,
        body: row.body.clone(),
        one_point: row.one_point.clone(),
        llm_provider: row.llm_provider.clone(),
        llm_model: row.llm_model.clone(),
        updated_at: row.updated_at,
    }
}

fn custom_row_to_api(row: &CustomSummaryRow) -> ApiSummary {
    ApiSummary {
        id: row.id,
        is_custom: true,
        body: row.body.clone(),
        one_point: row.one_point.clone(),
        llm_provider: row.llm_provider.clone(),
        llm_model: row.llm_model.clone(),
        updated_at: row.updated_at,
    }
}
