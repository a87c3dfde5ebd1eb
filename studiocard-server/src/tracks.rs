use axum::{
    extract::{Path, State},
    routing::patch,
    Json,
};
use studiocard_collab::PrimaryKey;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ValidatedJson, VisibilitySchema},
    serialized::{ToSerialized, Track},
    Router,
};

#[utoipa::path(
    patch,
    path = "/v1/tracks/{id}",
    tag = "tracks",
    request_body = VisibilitySchema,
    security(("BearerAuth" = [])),
    responses((status = 200, body = Track))
)]
pub(crate) async fn set_visibility(
    session: Session,
    State(context): State<ServerContext>,
    Path(track_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<VisibilitySchema>,
) -> ServerResult<Json<Track>> {
    let track = context
        .studio
        .tracks
        .set_visibility(&session, track_id, body.is_public)
        .await?;

    Ok(Json(track.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/tracks/{id}",
    tag = "tracks",
    security(("BearerAuth" = [])),
    responses((status = 200, description = "The track and its recording were deleted"))
)]
pub(crate) async fn delete_track(
    session: Session,
    State(context): State<ServerContext>,
    Path(track_id): Path<PrimaryKey>,
) -> ServerResult<()> {
    context.studio.tracks.delete(&session, track_id).await?;
    Ok(())
}

pub fn router() -> Router {
    Router::new().route("/:id", patch(set_visibility).delete(delete_track))
}
