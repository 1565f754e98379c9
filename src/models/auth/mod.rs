pub mod requests;
pub mod responses;

pub use requests::{LoginRequest, UpdateProfileRequest};
pub use responses::{
    LoginResponse, RefreshTokenResponse, TokenVerificationResponse, UserInfoResponse,
};
