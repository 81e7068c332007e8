use tracing::instrument;

use crate::api::session::RequireLogin;

/// Email change is not offered yet; the route only answers signed-in users.
#[instrument(skip_all)]
pub async fn editemail(RequireLogin(_user): RequireLogin) -> &'static str {
    "email"
}
