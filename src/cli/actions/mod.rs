pub mod api;
pub mod web;

mod run;

#[derive(Debug)]
pub enum Action {
    Api(api::Args),
    Web(web::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
