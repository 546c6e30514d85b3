use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::catalog::{
    CatalogQuery, ClientRemovalResponse, CreateClientRequest, UpdateClientRequest,
};
use crate::dtos::ErrorResponse;
use crate::middleware::CurrentActor;
use crate::models::{Client, ClientRemoval, ListClientsFilter};
use crate::services::ClientDetail;
use crate::utils::ValidatedJson;
use crate::AppState;

/// List clients of the caller's company
#[utoipa::path(
    get,
    path = "/clients",
    params(CatalogQuery),
    responses((status = 200, description = "Clients", body = Vec<Client>)),
    security(("bearer_auth" = [])),
    tag = "Clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<Client>>, AppError> {
    let filter = ListClientsFilter::from(query);
    let clients = state.store.list_clients(actor.company_id(), &filter).await?;
    Ok(Json(clients))
}

/// Add a client
#[utoipa::path(
    post,
    path = "/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 402, description = "Plan limit reached", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.catalog.create_client(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// A client with their balance
#[utoipa::path(
    get,
    path = "/clients/{client_id}",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client", body = ClientDetail),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientDetail>, AppError> {
    let detail = state.catalog.get_client(actor.company_id(), client_id).await?;
    Ok(Json(detail))
}

/// Update a client
#[utoipa::path(
    put,
    path = "/clients/{client_id}",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = Client),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(client_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .catalog
        .update_client(&actor, client_id, &req.into())
        .await?;
    Ok(Json(client))
}

/// Delete a client. Clients with invoices are deactivated instead.
#[utoipa::path(
    delete,
    path = "/clients/{client_id}",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client removed", body = ClientRemovalResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientRemovalResponse>, AppError> {
    let removal = state.catalog.delete_client(&actor, client_id).await?;
    Ok(Json(ClientRemovalResponse {
        client_id,
        deleted: removal == ClientRemoval::Deleted,
    }))
}
