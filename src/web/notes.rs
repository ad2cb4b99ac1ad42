//! Note pages. Every lookup is scoped to the caller, so a note owned by
//! someone else answers exactly like a missing one.

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use tracing::{debug, info};

use crate::entity::{Note, User};
use crate::error::NotekeeperError;
use crate::storage::SqliteStore;

use super::auth::{CurrentUser, RequireUser};
use super::error::AppError;
use super::forms::{FormErrors, NoteForm, WARNING};
use super::{redirect_found, routes, templates, AppState};

/// The `{slug}` path segment. A segment that cannot be decoded can never
/// name a stored note, so it answers 404 like any unknown slug.
pub struct SlugPath(pub String);

impl FromRequestParts<AppState> for SlugPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(slug)) => Ok(SlugPath(slug)),
            Err(rejection) => {
                debug!(path = %parts.uri.path(), %rejection, "undecodable slug segment");
                Err(AppError::NotFound(parts.extensions.get::<User>().cloned()))
            }
        }
    }
}

const ADD_HEADING: &str = "Добавить заметку";
const EDIT_HEADING: &str = "Редактировать заметку";

pub async fn home(CurrentUser(user): CurrentUser) -> Html<String> {
    Html(templates::home(user.as_ref()))
}

pub async fn list(RequireUser(user): RequireUser, State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let notes = state.store.lock().await.list_notes_for_owner(user.id)?;
    Ok(Html(templates::notes_list(&user, &notes)))
}

pub async fn success(RequireUser(user): RequireUser) -> Html<String> {
    Html(templates::success(&user))
}

pub async fn detail(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    SlugPath(slug): SlugPath,
) -> Result<Html<String>, AppError> {
    let store = state.store.lock().await;
    let note = owned_note(&store, &slug, &user)?;
    Ok(Html(templates::note_detail(&user, &note)))
}

pub async fn add_form(RequireUser(user): RequireUser) -> Html<String> {
    Html(templates::note_form(
        &user,
        ADD_HEADING,
        routes::NOTES_ADD,
        &NoteForm::default(),
        &FormErrors::default(),
    ))
}

pub async fn add(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    let store = state.store.lock().await;

    let draft = match form.clean(&store, None)? {
        Ok(draft) => draft,
        Err(errors) => return Ok(render_form(&user, ADD_HEADING, routes::NOTES_ADD, &form, &errors)),
    };

    match store.insert_note(user.id, &draft) {
        Ok(note) => {
            info!(user_id = user.id, slug = %note.slug, "note created");
            Ok(redirect_found(routes::NOTES_SUCCESS))
        }
        Err(NotekeeperError::SlugTaken(slug)) => {
            Ok(render_form(&user, ADD_HEADING, routes::NOTES_ADD, &form, &slug_taken(&slug)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_form(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    SlugPath(slug): SlugPath,
) -> Result<Html<String>, AppError> {
    let store = state.store.lock().await;
    let note = owned_note(&store, &slug, &user)?;
    Ok(Html(templates::note_form(
        &user,
        EDIT_HEADING,
        &routes::edit_url(&note.slug),
        &NoteForm::from_note(&note),
        &FormErrors::default(),
    )))
}

pub async fn edit(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    SlugPath(slug): SlugPath,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    let store = state.store.lock().await;
    let note = owned_note(&store, &slug, &user)?;
    let action = routes::edit_url(&note.slug);

    let draft = match form.clean(&store, Some(note.id))? {
        Ok(draft) => draft,
        Err(errors) => return Ok(render_form(&user, EDIT_HEADING, &action, &form, &errors)),
    };

    match store.update_note(note.id, user.id, &draft) {
        Ok(updated) => {
            info!(user_id = user.id, from = %note.slug, to = %updated.slug, "note updated");
            Ok(redirect_found(routes::NOTES_SUCCESS))
        }
        Err(NotekeeperError::SlugTaken(slug)) => {
            Ok(render_form(&user, EDIT_HEADING, &action, &form, &slug_taken(&slug)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_confirm(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    SlugPath(slug): SlugPath,
) -> Result<Html<String>, AppError> {
    let store = state.store.lock().await;
    let note = owned_note(&store, &slug, &user)?;
    Ok(Html(templates::delete_confirm(&user, &note)))
}

pub async fn delete(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    SlugPath(slug): SlugPath,
) -> Result<Response, AppError> {
    let store = state.store.lock().await;
    let note = owned_note(&store, &slug, &user)?;
    if !store.delete_note(note.id, user.id)? {
        return Err(AppError::NotFound(Some(user)));
    }
    info!(user_id = user.id, slug = %note.slug, "note deleted");
    Ok(redirect_found(routes::NOTES_SUCCESS))
}

/// Fetch a note the user owns; anything else is `NotFound`.
fn owned_note(store: &SqliteStore, slug: &str, user: &User) -> Result<Note, AppError> {
    store.get_owned_note(slug, user.id)?.ok_or_else(|| {
        debug!(user_id = user.id, slug = %slug, "note not visible to user");
        AppError::NotFound(Some(user.clone()))
    })
}

fn render_form(user: &User, heading: &str, action: &str, form: &NoteForm, errors: &FormErrors) -> Response {
    Html(templates::note_form(user, heading, action, form, errors)).into_response()
}

fn slug_taken(slug: &str) -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add("slug", format!("{}{}", slug, WARNING));
    errors
}
