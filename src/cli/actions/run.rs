use crate::cli::{
    actions::{api, web, Action},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Api(args) => api::execute(args).await,
        Action::Web(args) => web::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
