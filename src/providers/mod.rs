pub mod supabase;
pub mod table;
pub mod util;
