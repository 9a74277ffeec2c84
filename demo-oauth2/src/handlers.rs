use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use std::collections::HashMap;
use std::sync::Arc;

use oauth2_identity::OAuthFlowController;
use oauth2_identity_axum::AuthUser;

type Controller = State<Arc<OAuthFlowController>>;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head><body><h1>{title}</h1>{body}</body></html>"
    ))
}

fn provider_links(controller: &OAuthFlowController, names: &[String]) -> String {
    let prefix = &controller.config().route_prefix;
    names
        .iter()
        .map(|name| {
            let name = escape(name);
            format!("<li><a href=\"{prefix}/{name}/start?redirect=/protected\">Sign in with {name}</a></li>")
        })
        .collect()
}

pub(crate) async fn index(
    State(controller): Controller,
    user: Option<AuthUser>,
) -> Html<String> {
    match user {
        Some(u) => page(
            "Home",
            &format!(
                "<p>Hey {}!</p><p><a href=\"/protected\">Protected page</a> | <a href=\"/settings\">Linked accounts</a></p><form method=\"post\" action=\"{}/logout\"><button>Logout</button></form>",
                escape(&u.name),
                controller.config().route_prefix
            ),
        ),
        None => page("Home", "<p><a href=\"/login\">Sign in</a></p>"),
    }
}

pub(crate) async fn login(
    State(controller): Controller,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    let error = params
        .get("error")
        .map(|code| format!("<p>Sign-in failed: <code>{}</code></p>", escape(code)))
        .unwrap_or_default();
    let names = controller_provider_names(&controller);
    page(
        "Sign in",
        &format!("{error}<ul>{}</ul>", provider_links(&controller, &names)),
    )
}

pub(crate) async fn settings(
    State(controller): Controller,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let identities = controller
        .list_identities(&user.id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let prefix = &controller.config().route_prefix;

    let notice = ["linked", "unlinked", "error"]
        .iter()
        .filter_map(|key| params.get(*key).map(|v| format!("<p>{key}: {}</p>", escape(v))))
        .collect::<String>();

    let linked = identities
        .iter()
        .map(|i| {
            format!(
                "<li>{} ({}) <button onclick=\"fetch('{prefix}/{}/unlink', {{method: 'DELETE'}}).then(r => location.href = r.ok || r.redirected ? r.url : '/settings?error=' + r.status)\">Unlink</button></li>",
                escape(&i.provider),
                escape(i.email.as_deref().unwrap_or("no email")),
                escape(&i.provider)
            )
        })
        .collect::<String>();

    let link_forms = controller_provider_names(&controller)
        .iter()
        .filter(|name| !identities.iter().any(|i| &i.provider == *name))
        .map(|name| {
            let name = escape(name);
            format!("<form method=\"post\" action=\"{prefix}/{name}/link\"><button>Link {name}</button></form>")
        })
        .collect::<String>();

    Ok(page(
        "Linked accounts",
        &format!("{notice}<ul>{linked}</ul>{link_forms}<p><a href=\"/\">Home</a></p>"),
    ))
}

pub(crate) async fn protected(user: AuthUser) -> Html<String> {
    tracing::trace!(user_id = %user.id, role = %user.role, "Protected page");
    page(
        "Protected",
        &format!(
            "<p>Signed in as {} &lt;{}&gt;</p><p><a href=\"/\">Home</a></p>",
            escape(&user.name),
            escape(&user.email)
        ),
    )
}

fn controller_provider_names(controller: &OAuthFlowController) -> Vec<String> {
    let mut names = controller.provider_names();
    names.sort();
    names
}
