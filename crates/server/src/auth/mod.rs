// PIN gating: a document may carry a PIN hash in its collab state; readers
// who proved the PIN get a per-document JWT in an HttpOnly cookie.

pub mod cookie;
pub mod jwt;

pub use jwt::DocumentTokenService;
