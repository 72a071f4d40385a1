use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload. `id`, `email` and `name` identify the user; the rest is
/// standard registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,       // user ID
    pub email: String,
    pub name: String,
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
}
