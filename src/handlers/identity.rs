use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use uuid::Uuid;

use crate::error::AppError;

pub const ORGANIZATION_HEADER: &str = "X-Organization-Id";
pub const USER_HEADER: &str = "X-User-Id";

/// Who is calling, as asserted by the gateway in front of this service.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

fn header_uuid(req: &HttpRequest, name: &str) -> Option<Uuid> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}

impl FromRequest for CallerIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = header_uuid(req, ORGANIZATION_HEADER)
            .zip(header_uuid(req, USER_HEADER))
            .map(|(organization_id, user_id)| CallerIdentity {
                organization_id,
                user_id,
            });

        match identity {
            Some(identity) => ready(Ok(identity)),
            None => {
                log::warn!("Rejected {} {}: missing caller headers", req.method(), req.path());
                ready(Err(AppError::Unauthorized))
            }
        }
    }
}
