//! Read-only status dashboard over the shared status store.
//!
//! Stateless per request: every hit renders a fresh snapshot, and the HTML
//! page refreshes itself, so stale reads mid-cycle are harmless.

use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use wakefleet::status::{StatusSnapshot, StatusStore, now_ts};

pub fn router(status: StatusStore) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/status.json", get(status_json))
        .with_state(status)
}

async fn dashboard(State(status): State<StatusStore>) -> Html<String> {
    Html(render_dashboard(&status.snapshot()))
}

async fn status_json(State(status): State<StatusStore>) -> axum::Json<StatusSnapshot> {
    axum::Json(status.snapshot())
}

fn render_dashboard(snapshot: &StatusSnapshot) -> String {
    let mut rows = String::new();
    for site in &snapshot.sites {
        let class = if site.healthy {
            "ok"
        } else if site.state == "error" {
            "err"
        } else {
            "pending"
        };
        rows.push_str(&format!(
            "<tr><td><a href=\"{url}\">{url}</a></td>\
             <td class=\"{class}\">{state}</td>\
             <td>{ago}</td><td>{retries}</td></tr>\n",
            url = escape(&site.url),
            state = escape(&site.state),
            ago = ago(site.last_ping),
            retries = site.retries,
        ));
    }

    let banner = match &snapshot.registry_error {
        Some(error) => format!(
            "<p class=\"banner\">registry unavailable: {}</p>",
            escape(error)
        ),
        None => String::new(),
    };

    format!(
        "<!doctype html>\n<html><head>\
         <meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"30\">\
         <title>wakefleet</title>\
         <style>\
         body{{font-family:sans-serif;margin:2rem}}\
         table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:.4rem .8rem;text-align:left}}\
         .ok{{color:#176b2c}}.err{{color:#a11}}.pending{{color:#777}}\
         .banner{{color:#a11}}\
         </style></head><body>\n\
         <h1>wakefleet</h1>\n{banner}\
         <p>{total} sites &middot; {healthy} healthy &middot; {errored} errored</p>\n\
         <table><tr><th>site</th><th>state</th><th>last ping</th><th>retries</th></tr>\n\
         {rows}</table>\n</body></html>\n",
        total = snapshot.totals.total,
        healthy = snapshot.totals.healthy,
        errored = snapshot.totals.errored,
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn ago(ts: u64) -> String {
    let elapsed = now_ts().saturating_sub(ts);
    if elapsed < 120 {
        format!("{elapsed}s ago")
    } else if elapsed < 7200 {
        format!("{}m ago", elapsed / 60)
    } else {
        format!("{}h ago", elapsed / 3600)
    }
}
