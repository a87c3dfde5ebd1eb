//! Routes anyone can use without signing in, and the checkout

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};

use crate::{
    auth::TeacherSession,
    context::ServerContext,
    errors::ServerResult,
    schemas::{CheckoutSchema, ContactSchema, ValidatedJson},
    serialized::{CheckoutResult, Inquiry, TeacherCard, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/cards/{username}",
    tag = "public",
    responses(
        (status = 200, body = TeacherCard),
        (status = 404, description = "No teacher with that username")
    )
)]
pub(crate) async fn card(
    State(context): State<ServerContext>,
    Path(username): Path<String>,
) -> ServerResult<Json<TeacherCard>> {
    let card = context.studio.teachers.card(&username).await?;
    Ok(Json(card.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/contact",
    tag = "public",
    request_body = ContactSchema,
    responses((status = 200, body = Inquiry))
)]
pub(crate) async fn contact(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ContactSchema>,
) -> ServerResult<Json<Inquiry>> {
    let inquiry = context.studio.inquiries.submit(body.into()).await?;
    Ok(Json(inquiry.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    tag = "public",
    request_body = CheckoutSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = CheckoutResult),
        (status = 400, description = "Only upgrades can be purchased")
    )
)]
pub(crate) async fn checkout(
    gate: TeacherSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<CheckoutSchema>,
) -> ServerResult<Json<CheckoutResult>> {
    let url = context
        .studio
        .checkout
        .checkout_url(&gate.teacher, body.tier.into())?;

    Ok(Json(CheckoutResult {
        url: url.to_string(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/cards/:username", get(card))
        .route("/contact", post(contact))
}

pub fn checkout_router() -> Router {
    Router::new().route("/checkout", post(checkout))
}
