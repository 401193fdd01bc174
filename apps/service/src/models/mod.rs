pub mod check;

pub use check::{CHECK_ID_LEN, CheckRecord, CheckState, HttpMethod, Protocol};
