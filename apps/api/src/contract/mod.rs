// Contract drafting: request validation, prompt templating, response shaping.
// All generation goes through llm_client — no provider calls here.

pub mod handlers;
pub mod models;
pub mod prompts;
