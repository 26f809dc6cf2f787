pub mod error;
pub mod state;
pub mod supabase;

pub use error::PostgrestError;
pub use state::AppState;
pub use supabase::SupabaseClient;
