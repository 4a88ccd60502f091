//! Record store: typed rows, the access trait, and the Baserow HTTP client.

pub mod baserow;
pub mod port;
pub mod types;

pub use baserow::BaserowClient;
pub use port::RecordStore;
