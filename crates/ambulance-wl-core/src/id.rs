/// Placeholder id a client sends when it wants the server to assign one.
pub const NEW_ENTRY_ID: &str = "@new";

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Returns `true` when `id` is empty or the `"@new"` placeholder.
pub fn needs_generated_id(id: &str) -> bool {
    id.is_empty() || id == NEW_ENTRY_ID
}
