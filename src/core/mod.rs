pub mod record;
pub mod lookup_response;

pub use record::Record;
pub use lookup_response::LookupResponse;
