pub const PRODUCTION: &str = "production";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    pub environment: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(environment: &str) -> Self {
        Self {
            environment: environment.trim().to_lowercase(),
        }
    }

    /// Cookies are only marked `Secure` in production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }
}
