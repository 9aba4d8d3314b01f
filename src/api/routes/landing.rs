//! Landing Route
//!
//! - GET / - Redirects to the dashboard page

use axum::response::Redirect;

/// GET /
pub async fn redirect_to_index() -> Redirect {
    Redirect::permanent("/index.html")
}
