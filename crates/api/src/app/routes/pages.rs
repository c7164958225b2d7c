//! Page endpoints.
//!
//! Rendering is out of scope; each page answers with a small JSON body naming
//! itself and the caller, which is enough to observe where the gate let a
//! request through.

use axum::{extract::Extension, Json};
use serde_json::{json, Value};

use crate::context::SessionContext;

fn page(name: &str, ctx: Option<&SessionContext>) -> Json<Value> {
    Json(json!({
        "page": name,
        "user_id": ctx.map(|c| c.user_id().to_string()),
        "role": ctx.map(|c| c.role()),
    }))
}

pub async fn home(ctx: Option<Extension<SessionContext>>) -> Json<Value> {
    page("home", ctx.as_deref())
}

pub async fn sign_in(ctx: Option<Extension<SessionContext>>) -> Json<Value> {
    page("sign-in", ctx.as_deref())
}

pub async fn pending(Extension(ctx): Extension<SessionContext>) -> Json<Value> {
    page("pending", Some(&ctx))
}

pub async fn rejected(Extension(ctx): Extension<SessionContext>) -> Json<Value> {
    page("rejected", Some(&ctx))
}

pub async fn dashboard(Extension(ctx): Extension<SessionContext>) -> Json<Value> {
    page("dashboard", Some(&ctx))
}

pub async fn events(Extension(ctx): Extension<SessionContext>) -> Json<Value> {
    page("events", Some(&ctx))
}

pub async fn staff(Extension(ctx): Extension<SessionContext>) -> Json<Value> {
    page("staff", Some(&ctx))
}

pub async fn tickets(Extension(ctx): Extension<SessionContext>) -> Json<Value> {
    page("tickets", Some(&ctx))
}
