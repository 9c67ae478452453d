//! Error types for catalog construction and plan computation

/// Raised while turning raw recipe records into a [`crate::catalog::Catalog`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("recipe '{recipe}': {detail}")]
    InvalidRecord { recipe: String, detail: String },

    #[error("recipe '{recipe}': {entry} '{item}' has no amount")]
    MissingAmount {
        recipe: String,
        entry: &'static str,
        item: String,
    },

    #[error("recipe '{recipe}': unmapped building category '{raw}'")]
    UnknownCategory { recipe: String, raw: String },

    #[error("recipe '{recipe}': unknown item type '{kind}' for '{item}'")]
    UnknownItemKind {
        recipe: String,
        item: String,
        kind: String,
    },

    #[error("recipe '{recipe}' can never be satisfied: {reason}")]
    DegenerateRecipe { recipe: String, reason: String },

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Raised while expanding a recipe tree into a production plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("cannot determine the main product of recipe '{recipe}'")]
    RecipeResolution { recipe: String },

    #[error("recursion depth {depth} exceeded at recipe '{recipe}' - unintended cycle in recipe data")]
    GraphCycle { recipe: String, depth: usize },

    #[error("recipe '{recipe}' can never be satisfied: {reason}")]
    DegenerateRecipe { recipe: String, reason: String },

    #[error("no recipe for target resource '{0}'")]
    UnknownTarget(String),

    #[error("recipe '{0}' is required by a correction pass but missing from the catalog")]
    UnknownRecipe(String),

    #[error("target rate must be a positive number, got {0}")]
    InvalidRate(f64),
}
