/// Data models shared across provisioning, codes and token validation
pub mod claims;
pub mod code;
pub mod identity;
pub mod profile;

pub use claims::Claims;
pub use code::{CodePurpose, VerificationCode};
pub use identity::{
    AuthChallenge, AuthTokens, ChallengeKind, IdentityId, IdentityRecord, IdentityStatus,
    LoginOutcome, MfaSecret, UserGroup,
};
pub use profile::{NewProfile, Profile, ProfileId, ProfileKind, ProfileSeed, ProfileUpdate};
