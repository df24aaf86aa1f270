//! Route handlers for listing, creating, updating and deleting people.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::PersonId,
    endpoints::{self, format_endpoint},
    person::{
        Person, PersonForm, create_person,
        core::{delete_person, update_person},
        get_all_persons, get_person,
    },
};

/// The state needed for managing people.
#[derive(Debug, Clone)]
pub struct PersonState {
    /// The database connection for managing people.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PersonState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List every person.
pub async fn get_persons_endpoint(
    State(state): State<PersonState>,
) -> Result<Json<Vec<Person>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_all_persons(&connection).map(Json)
}

/// Create a person, responding with 201 and the new person.
pub async fn create_person_endpoint(
    State(state): State<PersonState>,
    body: Result<Json<PersonForm>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(form) = body?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let person = create_person(&form, &connection)
        .inspect_err(|error| tracing::debug!("could not create person: {error}"))?;

    let location = format_endpoint(endpoints::PERSON, person.id);

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(person)).into_response())
}

/// Get a single person by ID.
pub async fn get_person_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
) -> Result<Json<Person>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_person(person_id, &connection).map(Json)
}

/// Replace a person's name and flags.
pub async fn update_person_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
    body: Result<Json<PersonForm>, JsonRejection>,
) -> Result<Json<Person>, Error> {
    let Json(form) = body?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    update_person(person_id, &form, &connection).map(Json)
}

/// Delete a person along with the receipts they paid for.
pub async fn delete_person_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_person(person_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
