/// Bearer token validation against the provider's published key set
pub mod jwks;
pub mod token_validator;

pub use jwks::{HttpKeySetSource, Jwk, JwkSet, KeySetError, KeySetSource, RsaPublicKeyParts};
pub use token_validator::{TokenValidator, TokenValidatorConfig};
